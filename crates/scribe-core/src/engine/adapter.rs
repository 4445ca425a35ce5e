//! The engine trait consumed by the session manager

use std::path::Path;
use std::sync::Arc;

use super::{AudioHandle, AudioMetadata, EngineResult, PlaybackHandle, PlaybackListener};

/// Handle-based native audio backend
///
/// All methods take `&self`: implementations are shared between the session
/// manager (UI thread) and their own callback thread. `load_audio` may block
/// while the file is opened and must not be called from a latency-sensitive
/// thread.
pub trait AudioEngine: Send + Sync {
    /// Open a file and return a handle for it
    fn load_audio(&self, path: &Path) -> EngineResult<AudioHandle>;

    fn metadata(&self, audio: AudioHandle) -> EngineResult<AudioMetadata>;

    /// Start playback of `[start_frame, end_frame)` on a new channel
    fn play(
        &self,
        audio: AudioHandle,
        start_frame: u64,
        end_frame: u64,
    ) -> EngineResult<PlaybackHandle>;

    fn pause(&self, playback: PlaybackHandle) -> EngineResult<()>;

    fn resume(&self, playback: PlaybackHandle) -> EngineResult<()>;

    /// Stop playback and release the channel
    fn stop(&self, playback: PlaybackHandle) -> EngineResult<()>;

    fn seek(&self, playback: PlaybackHandle, frame: u64) -> EngineResult<()>;

    /// Current frame of a channel
    fn position(&self, playback: PlaybackHandle) -> EngineResult<u64>;

    fn add_playback_listener(&self, listener: Arc<dyn PlaybackListener>);

    /// Remove a listener previously added (matched by pointer identity)
    fn remove_playback_listener(&self, listener: &Arc<dyn PlaybackListener>);
}
