//! Phase-locked loop smoother
//!
//! Position is modelled as the phase of an oscillator whose frequency is the
//! playback rate in frames per millisecond. Each tick the phase advances at
//! the current frequency, then a proportional term pulls the phase toward
//! the engine report and an integral term nudges the frequency. A jump
//! larger than [`MAX_PHASE_ERROR`] counts as lock loss (seek, dropout) and
//! resyncs straight to the report.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::{update_state, PlayheadSmoother, SmoothingResult};
use crate::clock::Clock;
use crate::session::SessionState;
use crate::types::NOMINAL_FRAMES_PER_MS;

/// Share of the phase error corrected per tick
pub const PHASE_GAIN: f64 = 0.1;
/// Frequency change per frame of phase error
pub const FREQUENCY_GAIN: f64 = 0.001;
/// Phase error (frames) beyond which the loop resyncs
pub const MAX_PHASE_ERROR: f64 = 1000.0;
/// Lowest frequency (20kHz)
pub const MIN_FREQUENCY: f64 = 20.0;
/// Highest frequency (96kHz)
pub const MAX_FREQUENCY: f64 = 96.0;
/// Tick length assumed when no time has passed (~60fps)
const FALLBACK_TICK_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PllState {
    phase: f64,
    frequency: f64,
    /// Exponentially averaged phase error, for monitoring
    phase_error: f64,
    last_update_ms: u64,
    last_target: u64,
    /// Cleared by reset: the next report is taken as-is
    locked: bool,
}

impl PllState {
    fn locked_to(target: u64, frequency: f64, now_ms: u64) -> Self {
        Self {
            phase: target as f64,
            frequency,
            phase_error: 0.0,
            last_update_ms: now_ms,
            last_target: target,
            locked: true,
        }
    }

    fn unlocked(now_ms: u64) -> Self {
        Self {
            locked: false,
            ..Self::locked_to(0, NOMINAL_FRAMES_PER_MS, now_ms)
        }
    }

    fn step(&self, target: u64, delta_ms: u64, now_ms: u64) -> Self {
        if !self.locked {
            return Self::locked_to(target, self.frequency, now_ms);
        }

        let mut dt = now_ms.saturating_sub(self.last_update_ms);
        if dt == 0 {
            dt = if delta_ms > 0 { delta_ms } else { FALLBACK_TICK_MS };
        }

        let expected_phase = self.phase + self.frequency * dt as f64;
        let error = target as f64 - expected_phase;
        let jump = (target as f64 - self.last_target as f64).abs();

        if error.abs() > MAX_PHASE_ERROR || jump > MAX_PHASE_ERROR {
            log::debug!("pll: lock lost (error {:.1}, jump {:.0}), resyncing", error, jump);
            return Self::locked_to(target, self.frequency, now_ms);
        }

        let frequency = (self.frequency + error * FREQUENCY_GAIN).clamp(MIN_FREQUENCY, MAX_FREQUENCY);

        Self {
            phase: expected_phase + error * PHASE_GAIN,
            frequency,
            phase_error: self.phase_error * 0.95 + error * 0.05,
            last_update_ms: now_ms,
            last_target: target,
            locked: true,
        }
    }
}

/// Smoother that locks an adaptive oscillator onto engine reports
pub struct PhaseLockedLoopSmoother {
    state: ArcSwap<PllState>,
    clock: Arc<dyn Clock>,
}

impl PhaseLockedLoopSmoother {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            state: ArcSwap::from_pointee(PllState::locked_to(0, NOMINAL_FRAMES_PER_MS, now)),
            clock,
        }
    }

    /// Locked frequency in frames per millisecond
    pub fn frequency(&self) -> f64 {
        self.state.load().frequency
    }

    /// Averaged phase error in frames
    pub fn phase_error(&self) -> f64 {
        self.state.load().phase_error
    }
}

impl PlayheadSmoother for PhaseLockedLoopSmoother {
    fn update_and_get_smoothed_position(
        &self,
        target_frame: u64,
        delta_ms: u64,
        state: SessionState,
    ) -> SmoothingResult {
        let now = self.clock.now_ms();

        if state != SessionState::Playing {
            self.state.store(Arc::new(PllState::locked_to(
                target_frame,
                NOMINAL_FRAMES_PER_MS,
                now,
            )));
            return SmoothingResult::snapped(target_frame);
        }

        let next = update_state(&self.state, |current| current.step(target_frame, delta_ms, now));
        let smoothed = next.phase.round().max(0.0) as u64;

        log::trace!(
            "pll: target={}, smoothed={}, freq={:.2} f/ms, error={:.1}",
            target_frame,
            smoothed,
            next.frequency,
            next.phase_error
        );
        SmoothingResult::new(smoothed, target_frame)
    }

    fn reset(&self) {
        self.state.store(Arc::new(PllState::unlocked(self.clock.now_ms())));
        log::debug!("PLL smoother reset");
    }

    fn name(&self) -> &'static str {
        "phase-locked-loop"
    }
}
