//! Per-paint playback following

use std::sync::Arc;

use super::{PaintMode, Projection, ViewportProjector, ViewportUiState};
use crate::engine::{AudioHandle, PlaybackHandle};
use crate::session::{SessionManager, SessionState};
use crate::types::frames_to_seconds;

/// Render-side consumer of the smoothed playhead
pub trait Viewport {
    /// Called once per paint cycle while a file is shown
    fn follow_playback(&mut self, position_seconds: f64, total_seconds: f64, is_playing: bool);

    /// Called instead of `follow_playback` while nothing can be rendered
    fn show_placeholder(&mut self, _mode: PaintMode, _message: Option<&str>) {}
}

/// Drives a [`Viewport`] from a session, one tick per paint
///
/// Resets the smoother whenever a different file is loaded, a different
/// playback channel starts or the user seeks, so no history leaks across the
/// jump.
pub struct PlaybackFollower {
    session: Arc<SessionManager>,
    projector: ViewportProjector,
    last_audio: Option<AudioHandle>,
    last_playback: Option<PlaybackHandle>,
    last_seek_count: u64,
}

impl PlaybackFollower {
    pub fn new(session: Arc<SessionManager>, projector: ViewportProjector) -> Self {
        Self {
            session,
            projector,
            last_audio: None,
            last_playback: None,
            last_seek_count: 0,
        }
    }

    pub fn projector(&self) -> &ViewportProjector {
        &self.projector
    }

    pub fn tick(&mut self, viewport: &mut dyn Viewport, ui: &ViewportUiState) -> Projection {
        let ctx = self.session.context();

        if ctx.audio_handle() != self.last_audio
            || ctx.playback_handle() != self.last_playback
            || ctx.seek_count() != self.last_seek_count
        {
            log::debug!(
                "tick: session changed ({:?}/{:?}, seek #{}), resetting smoother",
                ctx.audio_handle(),
                ctx.playback_handle(),
                ctx.seek_count()
            );
            self.projector.reset_smoother();
            self.last_audio = ctx.audio_handle();
            self.last_playback = ctx.playback_handle();
            self.last_seek_count = ctx.seek_count();
        }

        let projection = self.projector.project(&ctx, ui);
        if projection.mode == PaintMode::Render {
            viewport.follow_playback(
                frames_to_seconds(projection.playhead_frame, ctx.sample_rate()),
                ctx.total_duration_seconds(),
                ctx.state() == SessionState::Playing,
            );
        } else {
            viewport.show_placeholder(projection.mode, projection.error_message.as_deref());
        }
        projection
    }
}
