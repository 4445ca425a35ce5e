//! Playback callbacks delivered by the engine

use super::{PlaybackHandle, PlaybackState};

/// Receiver for engine playback callbacks
///
/// Callbacks run on the engine's own thread at high frequency, so
/// implementations must not block. Every method defaults to a no-op.
pub trait PlaybackListener: Send + Sync {
    fn on_progress(&self, _playback: PlaybackHandle, _position_frames: u64, _total_frames: u64) {}

    fn on_state_changed(
        &self,
        _playback: PlaybackHandle,
        _new_state: PlaybackState,
        _old_state: PlaybackState,
    ) {
    }

    fn on_playback_complete(&self, _playback: PlaybackHandle) {}

    fn on_playback_error(&self, _playback: PlaybackHandle, _message: &str) {}
}
