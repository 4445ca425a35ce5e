//! Linear interpolation between engine reports

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{update_state, PlayheadSmoother, SmoothingResult};
use crate::clock::Clock;
use crate::session::SessionState;
use crate::types::NOMINAL_FRAMES_PER_MS;

/// Weight kept from the previous rate estimate when a new report arrives
const RATE_RETENTION: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
struct LinearState {
    previous_target: u64,
    current_target: u64,
    /// Clock time at which `current_target` arrived
    target_update_ms: u64,
    /// Frames per millisecond
    playback_rate: f64,
    /// Cleared by reset: the next report is taken as-is
    synced: bool,
}

impl LinearState {
    fn snapped(target: u64, now_ms: u64) -> Self {
        Self {
            previous_target: target,
            current_target: target,
            target_update_ms: now_ms,
            playback_rate: NOMINAL_FRAMES_PER_MS,
            synced: true,
        }
    }

    fn unsynced(now_ms: u64) -> Self {
        Self {
            synced: false,
            ..Self::snapped(0, now_ms)
        }
    }

    /// Fold in a target; only a changed target counts as a new report
    fn observe(&self, target: u64, now_ms: u64) -> Self {
        if !self.synced {
            return Self::snapped(target, now_ms);
        }
        if target == self.current_target {
            return *self;
        }

        let frames_delta = target as i64 - self.current_target as i64;
        let time_delta = now_ms.saturating_sub(self.target_update_ms);
        let playback_rate = if time_delta > 0 && frames_delta > 0 {
            let observed = frames_delta as f64 / time_delta as f64;
            self.playback_rate * RATE_RETENTION + observed * (1.0 - RATE_RETENTION)
        } else {
            self.playback_rate
        };

        Self {
            previous_target: self.current_target,
            current_target: target,
            target_update_ms: now_ms,
            playback_rate,
            synced: true,
        }
    }

    /// Position between the last two reports, never past the newest one
    fn interpolate(&self, now_ms: u64) -> u64 {
        let elapsed = now_ms.saturating_sub(self.target_update_ms) as f64;
        let advance = (elapsed * self.playback_rate).round() as u64;
        self.previous_target
            .saturating_add(advance)
            .min(self.current_target)
    }
}

/// Interpolates from the previous report toward the latest one at a
/// measured playback rate
///
/// The rate is re-estimated from every pair of reports and blended into the
/// running estimate (70% old, 30% new). The output never passes the newest
/// confirmed target, so it cannot overshoot.
pub struct LinearInterpolationSmoother {
    state: ArcSwap<LinearState>,
    clock: Arc<dyn Clock>,
}

impl LinearInterpolationSmoother {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            state: ArcSwap::from_pointee(LinearState::snapped(0, now)),
            clock,
        }
    }

    /// Current rate estimate in frames per millisecond
    pub fn playback_rate(&self) -> f64 {
        self.state.load().playback_rate
    }
}

impl PlayheadSmoother for LinearInterpolationSmoother {
    fn update_and_get_smoothed_position(
        &self,
        target_frame: u64,
        _delta_ms: u64,
        state: SessionState,
    ) -> SmoothingResult {
        let now = self.clock.now_ms();

        if state != SessionState::Playing {
            self.state.store(Arc::new(LinearState::snapped(target_frame, now)));
            return SmoothingResult::snapped(target_frame);
        }

        let next = update_state(&self.state, |current| current.observe(target_frame, now));
        let smoothed = next.interpolate(now);

        log::trace!(
            "linear: target={}, smoothed={}, rate={:.1} f/ms",
            target_frame,
            smoothed,
            next.playback_rate
        );
        SmoothingResult::new(smoothed, target_frame)
    }

    fn reset(&self) {
        self.state.store(Arc::new(LinearState::unsynced(self.clock.now_ms())));
        log::debug!("Linear interpolation smoother reset");
    }

    fn name(&self) -> &'static str {
        "linear-interpolation"
    }
}
