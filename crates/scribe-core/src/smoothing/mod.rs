//! Playhead smoothing
//!
//! The engine reports positions in bursts from its callback thread while the
//! renderer wants a position every display frame. A [`PlayheadSmoother`]
//! turns the latest raw target frame plus elapsed time into a render-ready
//! frame.
//!
//! All smoothers share two rules:
//! - outside PLAYING they snap to the target with zero distance
//! - state lives in an [`ArcSwap`] cell updated by compare-and-retry, so the
//!   audio and render threads never block each other
//!
//! | Kind | Behaviour |
//! |---|---|
//! | `none` | Raw engine position |
//! | `linear-interpolation` | Interpolates between the last two reports at a measured rate |
//! | `phase-locked-loop` | Phase/frequency loop locked to the reports |
//! | `predictive-extrapolation` | Extrapolates at the nominal rate with 10% drift correction |

mod linear;
mod metrics;
mod metrics_aware;
mod none;
mod pll;
mod predictive;

pub use linear::*;
pub use metrics::*;
pub use metrics_aware::*;
pub use none::*;
pub use pll::*;
pub use predictive::*;

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::SmoothingConfig;
use crate::session::SessionState;

/// Output of one smoothing step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmoothingResult {
    pub smoothed_frame: u64,
    /// `target - smoothed`; positive when the smoother lags behind
    pub distance_from_target: i64,
}

impl SmoothingResult {
    pub fn new(smoothed_frame: u64, target_frame: u64) -> Self {
        Self {
            smoothed_frame,
            distance_from_target: target_frame as i64 - smoothed_frame as i64,
        }
    }

    /// Result that sits exactly on the target
    pub fn snapped(target_frame: u64) -> Self {
        Self {
            smoothed_frame: target_frame,
            distance_from_target: 0,
        }
    }
}

/// Converts raw engine positions into smooth render positions
///
/// Callable concurrently from the engine callback thread and the render
/// thread.
pub trait PlayheadSmoother: Send + Sync {
    /// Feed the latest raw target and get the frame to render
    ///
    /// `delta_ms` is the time since the previous render tick.
    fn update_and_get_smoothed_position(
        &self,
        target_frame: u64,
        delta_ms: u64,
        state: SessionState,
    ) -> SmoothingResult;

    /// Forget all history (stop, seek, reload)
    fn reset(&self);

    /// Sample rate of the loaded file changed
    fn set_sample_rate(&self, _sample_rate: u32) {}

    fn name(&self) -> &'static str;
}

impl<S: PlayheadSmoother + ?Sized> PlayheadSmoother for Box<S> {
    fn update_and_get_smoothed_position(
        &self,
        target_frame: u64,
        delta_ms: u64,
        state: SessionState,
    ) -> SmoothingResult {
        (**self).update_and_get_smoothed_position(target_frame, delta_ms, state)
    }

    fn reset(&self) {
        (**self).reset()
    }

    fn set_sample_rate(&self, sample_rate: u32) {
        (**self).set_sample_rate(sample_rate)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Lets a caller keep a handle on a smoother it hands to a projector
impl<S: PlayheadSmoother + ?Sized> PlayheadSmoother for Arc<S> {
    fn update_and_get_smoothed_position(
        &self,
        target_frame: u64,
        delta_ms: u64,
        state: SessionState,
    ) -> SmoothingResult {
        (**self).update_and_get_smoothed_position(target_frame, delta_ms, state)
    }

    fn reset(&self) {
        (**self).reset()
    }

    fn set_sample_rate(&self, sample_rate: u32) {
        (**self).set_sample_rate(sample_rate)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Compare-and-retry update of a smoother state cell
///
/// `f` may run more than once under contention and must be pure. Returns the
/// state that was installed.
pub(crate) fn update_state<S, F>(cell: &ArcSwap<S>, mut f: F) -> Arc<S>
where
    F: FnMut(&S) -> S,
{
    let mut installed = None;
    cell.rcu(|current| {
        let next = Arc::new(f(current));
        installed = Some(Arc::clone(&next));
        next
    });
    installed.unwrap_or_else(|| cell.load_full())
}

/// Smoothing algorithm selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SmootherKind {
    #[serde(rename = "none")]
    Passthrough,
    LinearInterpolation,
    #[default]
    PredictiveExtrapolation,
    PhaseLockedLoop,
}

impl SmootherKind {
    pub const ALL: [SmootherKind; 4] = [
        SmootherKind::Passthrough,
        SmootherKind::LinearInterpolation,
        SmootherKind::PredictiveExtrapolation,
        SmootherKind::PhaseLockedLoop,
    ];

    /// Configuration name
    pub const fn name(self) -> &'static str {
        match self {
            SmootherKind::Passthrough => "none",
            SmootherKind::LinearInterpolation => "linear-interpolation",
            SmootherKind::PredictiveExtrapolation => "predictive-extrapolation",
            SmootherKind::PhaseLockedLoop => "phase-locked-loop",
        }
    }

    /// Parse a configuration name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Parse a configuration name, falling back to the default kind
    pub fn from_name(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            let fallback = Self::default();
            log::warn!(
                "from_name: unknown smoother '{}', using {}",
                name,
                fallback.name()
            );
            fallback
        })
    }

    /// Construct a fresh smoother of this kind
    pub fn build(self, clock: Arc<dyn Clock>) -> Box<dyn PlayheadSmoother> {
        match self {
            SmootherKind::Passthrough => Box::new(NoSmoother),
            SmootherKind::LinearInterpolation => Box::new(LinearInterpolationSmoother::new(clock)),
            SmootherKind::PredictiveExtrapolation => {
                Box::new(PredictiveExtrapolationSmoother::new(clock))
            }
            SmootherKind::PhaseLockedLoop => Box::new(PhaseLockedLoopSmoother::new(clock)),
        }
    }
}

impl fmt::Display for SmootherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the smoother described by `config`
///
/// Wrapped in a [`MetricsAwarePlayheadSmoother`] when metrics collection is
/// enabled.
pub fn build_smoother(config: &SmoothingConfig, clock: Arc<dyn Clock>) -> Box<dyn PlayheadSmoother> {
    let smoother = config.kind.build(Arc::clone(&clock));
    log::info!(
        "build_smoother: {} (metrics: {})",
        smoother.name(),
        config.collect_metrics
    );
    if config.collect_metrics {
        Box::new(
            MetricsAwarePlayheadSmoother::new(smoother, config.metrics_window, clock)
                .with_log_interval(config.metrics_log_interval),
        )
    } else {
        smoother
    }
}
