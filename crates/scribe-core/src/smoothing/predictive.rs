//! Predictive extrapolation smoother

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{update_state, PlayheadSmoother, SmoothingResult};
use crate::clock::Clock;
use crate::session::SessionState;
use crate::types::NOMINAL_SAMPLE_RATE;

/// Frames of disagreement with the engine before snapping to it
pub const RESYNC_THRESHOLD: i64 = 1000;
/// Share of the drift corrected per tick
pub const DRIFT_CORRECTION: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PredictiveState {
    position: u64,
    last_target: u64,
    last_update_ms: u64,
    was_playing: bool,
}

impl PredictiveState {
    fn synced(target: u64, now_ms: u64, playing: bool) -> Self {
        Self {
            position: target,
            last_target: target,
            last_update_ms: now_ms,
            was_playing: playing,
        }
    }

    fn step(&self, target: u64, now_ms: u64) -> Self {
        let jump = target as i64 - self.last_target as i64;
        if !self.was_playing || jump.abs() > RESYNC_THRESHOLD {
            log::debug!("predictive: resyncing to {} (was at {})", target, self.position);
            return Self::synced(target, now_ms, true);
        }

        let elapsed_ms = now_ms.saturating_sub(self.last_update_ms);
        let advance = (elapsed_ms as f64 / 1000.0 * NOMINAL_SAMPLE_RATE as f64).round() as u64;
        let extrapolated = self.position.saturating_add(advance);

        let drift = target as i64 - extrapolated as i64;
        if drift.abs() > RESYNC_THRESHOLD {
            log::debug!("predictive: drift of {} frames, resyncing", drift);
            return Self::synced(target, now_ms, true);
        }

        let correction = (drift as f64 * DRIFT_CORRECTION).round() as i64;
        Self {
            position: extrapolated.saturating_add_signed(correction),
            last_target: target,
            last_update_ms: now_ms,
            was_playing: true,
        }
    }
}

/// Extrapolates at the nominal sample rate between engine reports
///
/// Each tick advances by the elapsed wall time and corrects 10% of the
/// remaining drift toward the report. Playback start, seeks and drift beyond
/// [`RESYNC_THRESHOLD`] snap straight to the report.
pub struct PredictiveExtrapolationSmoother {
    state: ArcSwap<PredictiveState>,
    clock: Arc<dyn Clock>,
}

impl PredictiveExtrapolationSmoother {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            state: ArcSwap::from_pointee(PredictiveState::synced(0, now, false)),
            clock,
        }
    }
}

impl PlayheadSmoother for PredictiveExtrapolationSmoother {
    fn update_and_get_smoothed_position(
        &self,
        target_frame: u64,
        _delta_ms: u64,
        state: SessionState,
    ) -> SmoothingResult {
        let now = self.clock.now_ms();

        if state != SessionState::Playing {
            self.state.store(Arc::new(PredictiveState::synced(target_frame, now, false)));
            return SmoothingResult::snapped(target_frame);
        }

        let next = update_state(&self.state, |current| current.step(target_frame, now));

        log::trace!("predictive: target={}, smoothed={}", target_frame, next.position);
        SmoothingResult::new(next.position, target_frame)
    }

    fn reset(&self) {
        self.state.store(Arc::new(PredictiveState::synced(
            0,
            self.clock.now_ms(),
            false,
        )));
        log::debug!("Predictive smoother reset");
    }

    fn name(&self) -> &'static str {
        "predictive-extrapolation"
    }
}
