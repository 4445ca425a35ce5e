//! Session snapshot to visible frame window

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::SmoothingConfig;
use crate::session::{SessionContext, SessionState};
use crate::smoothing::{build_smoother, PlayheadSmoother};

/// What the viewport should draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintMode {
    /// Nothing loaded
    Empty,
    Loading,
    Error,
    /// Waveform with playhead
    Render,
}

impl PaintMode {
    pub fn for_state(state: SessionState) -> Self {
        match state {
            SessionState::NoAudio => PaintMode::Empty,
            SessionState::Loading => PaintMode::Loading,
            SessionState::Error => PaintMode::Error,
            SessionState::Ready | SessionState::Playing | SessionState::Paused => {
                PaintMode::Render
            }
        }
    }
}

/// Canvas geometry supplied by the UI
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportUiState {
    pub canvas_width_px: u32,
    pub canvas_height_px: u32,
    pub frames_per_pixel: f64,
}

/// Frame window centred on the smoothed playhead
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub mode: PaintMode,
    pub playhead_frame: u64,
    /// Target minus smoothed playhead
    pub distance_from_target: i64,
    /// May be negative near the start of the file
    pub start_frame: i64,
    pub end_frame: i64,
    /// Increments on every projection; lets the renderer drop stale frames
    pub generation: u64,
    pub error_message: Option<String>,
}

impl Projection {
    pub fn width_frames(&self) -> i64 {
        self.end_frame - self.start_frame
    }
}

/// Projection converted to seconds for the waveform widget
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformViewportSpec {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub width_px: u32,
    pub height_px: u32,
    pub pixels_per_second: u32,
}

/// Turns session snapshots into projections, smoothing the playhead
///
/// Owned by the render thread.
pub struct ViewportProjector {
    smoother: Box<dyn PlayheadSmoother>,
    clock: Arc<dyn Clock>,
    last_update_ms: Option<u64>,
    sample_rate: u32,
    generation: u64,
}

impl ViewportProjector {
    pub fn new(smoother: Box<dyn PlayheadSmoother>, clock: Arc<dyn Clock>) -> Self {
        log::info!("ViewportProjector: using {} smoother", smoother.name());
        Self {
            smoother,
            clock,
            last_update_ms: None,
            sample_rate: 0,
            generation: 0,
        }
    }

    pub fn from_config(config: &SmoothingConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(build_smoother(config, Arc::clone(&clock)), clock)
    }

    pub fn smoother(&self) -> &dyn PlayheadSmoother {
        self.smoother.as_ref()
    }

    pub fn reset_smoother(&self) {
        self.smoother.reset();
    }

    /// Project the snapshot onto the canvas
    ///
    /// Outside [`PaintMode::Render`] the smoother is reset and the window is
    /// empty. A pending seek is shown as the playhead while stopped.
    pub fn project(&mut self, ctx: &SessionContext, ui: &ViewportUiState) -> Projection {
        self.generation += 1;
        let mode = PaintMode::for_state(ctx.state());
        let error_message = ctx.error_message().map(str::to_string);

        if mode != PaintMode::Render {
            self.smoother.reset();
            self.last_update_ms = None;
            return Projection {
                mode,
                playhead_frame: 0,
                distance_from_target: 0,
                start_frame: 0,
                end_frame: 0,
                generation: self.generation,
                error_message,
            };
        }

        if ctx.sample_rate() != self.sample_rate {
            self.sample_rate = ctx.sample_rate();
            self.smoother.set_sample_rate(self.sample_rate);
        }

        let now = self.clock.now_ms();
        let delta_ms = self
            .last_update_ms
            .map(|last| now.saturating_sub(last))
            .unwrap_or(0);
        self.last_update_ms = Some(now);

        let target = ctx
            .pending_start_frame()
            .unwrap_or_else(|| ctx.playhead_frame());
        let result = self
            .smoother
            .update_and_get_smoothed_position(target, delta_ms, ctx.state());
        log::trace!(
            "project: target={}, smoothed={}, distance={}",
            target,
            result.smoothed_frame,
            result.distance_from_target
        );

        let width_frames = ((ui.canvas_width_px as f64 * ui.frames_per_pixel).round() as i64).max(1);
        let start_frame = result.smoothed_frame as i64 - width_frames / 2;

        Projection {
            mode,
            playhead_frame: result.smoothed_frame,
            distance_from_target: result.distance_from_target,
            start_frame,
            end_frame: start_frame + width_frames,
            generation: self.generation,
            error_message,
        }
    }

    /// Express a projection in seconds and pixels per second
    pub fn to_waveform_viewport(
        projection: &Projection,
        ui: &ViewportUiState,
        sample_rate: u32,
    ) -> WaveformViewportSpec {
        let rate = sample_rate.max(1) as f64;
        let pixels_per_second = if ui.frames_per_pixel > 0.0 {
            ((rate / ui.frames_per_pixel).round() as u32).max(1)
        } else {
            1
        };
        WaveformViewportSpec {
            start_seconds: projection.start_frame as f64 / rate,
            end_seconds: projection.end_frame as f64 / rate,
            width_px: ui.canvas_width_px,
            height_px: ui.canvas_height_px,
            pixels_per_second,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::{AudioHandle, PlaybackHandle};
    use crate::session::SessionCommand;
    use crate::smoothing::{MetricsAwarePlayheadSmoother, NoSmoother};
    use std::path::PathBuf;

    const UI: ViewportUiState = ViewportUiState {
        canvas_width_px: 800,
        canvas_height_px: 200,
        frames_per_pixel: 100.0,
    };

    fn ready() -> SessionContext {
        SessionContext::create_initial()
            .apply(&SessionCommand::BeginLoad {
                file: PathBuf::from("a.wav"),
            })
            .apply(&SessionCommand::LoadFile {
                file: PathBuf::from("a.wav"),
                audio_handle: AudioHandle::new(1),
                total_frames: 441_000,
                sample_rate: 44_100,
            })
    }

    fn projector() -> ViewportProjector {
        ViewportProjector::new(Box::new(NoSmoother), Arc::new(ManualClock::new(0)))
    }

    #[test]
    fn test_paint_modes() {
        assert_eq!(PaintMode::for_state(SessionState::NoAudio), PaintMode::Empty);
        assert_eq!(PaintMode::for_state(SessionState::Loading), PaintMode::Loading);
        assert_eq!(PaintMode::for_state(SessionState::Error), PaintMode::Error);
        assert_eq!(PaintMode::for_state(SessionState::Paused), PaintMode::Render);
    }

    #[test]
    fn test_window_centred_on_playhead() {
        let mut projector = projector();
        let ctx = ready()
            .apply(&SessionCommand::StartPlayback {
                playback_handle: PlaybackHandle::new(2),
                start_frame: 0,
            })
            .apply(&SessionCommand::UpdatePosition {
                position_frames: 100_000,
            });

        let projection = projector.project(&ctx, &UI);
        assert_eq!(projection.mode, PaintMode::Render);
        assert_eq!(projection.playhead_frame, 100_000);
        assert_eq!(projection.start_frame, 60_000);
        assert_eq!(projection.end_frame, 140_000);
        assert_eq!(projection.width_frames(), 80_000);
    }

    #[test]
    fn test_window_may_start_before_zero() {
        let mut projector = projector();
        let projection = projector.project(&ready(), &UI);
        assert_eq!(projection.start_frame, -40_000);
    }

    #[test]
    fn test_pending_seek_shown_as_playhead() {
        let mut projector = projector();
        let ctx = ready().apply(&SessionCommand::SetPendingSeek {
            target_frame: 200_000,
        });
        assert_eq!(projector.project(&ctx, &UI).playhead_frame, 200_000);
    }

    #[test]
    fn test_smoother_follows_file_sample_rate() {
        let clock = Arc::new(ManualClock::new(0));
        let smoother = Arc::new(MetricsAwarePlayheadSmoother::new(NoSmoother, 100, clock.clone()));
        let mut projector = ViewportProjector::new(Box::new(Arc::clone(&smoother)), clock);

        let ctx = SessionContext::create_initial()
            .apply(&SessionCommand::BeginLoad {
                file: PathBuf::from("b.flac"),
            })
            .apply(&SessionCommand::LoadFile {
                file: PathBuf::from("b.flac"),
                audio_handle: AudioHandle::new(3),
                total_frames: 96_000,
                sample_rate: 48_000,
            });
        projector.project(&ctx, &UI);
        assert_eq!(smoother.metrics().sample_rate(), 48_000);
    }

    #[test]
    fn test_generation_increments() {
        let mut projector = projector();
        let a = projector.project(&SessionContext::create_initial(), &UI);
        let b = projector.project(&ready(), &UI);
        assert_eq!(a.mode, PaintMode::Empty);
        assert!(b.generation > a.generation);
    }

    #[test]
    fn test_error_message_carried() {
        let mut projector = projector();
        let ctx = ready().apply(&SessionCommand::SetLoadError {
            message: "bad header".to_string(),
        });
        let projection = projector.project(&ctx, &UI);
        assert_eq!(projection.mode, PaintMode::Error);
        assert_eq!(projection.error_message.as_deref(), Some("bad header"));
    }

    #[test]
    fn test_waveform_viewport_spec() {
        let mut projector = projector();
        let ctx = ready().apply(&SessionCommand::SetPendingSeek {
            target_frame: 88_200,
        });
        let projection = projector.project(&ctx, &UI);
        let spec = ViewportProjector::to_waveform_viewport(&projection, &UI, 44_100);
        assert!((spec.start_seconds - (48_200.0 / 44_100.0)).abs() < 1e-9);
        assert!((spec.end_seconds - (128_200.0 / 44_100.0)).abs() < 1e-9);
        assert_eq!(spec.pixels_per_second, 441);
        assert_eq!(spec.width_px, 800);
    }
}
