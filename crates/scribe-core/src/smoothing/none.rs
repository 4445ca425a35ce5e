//! Pass-through smoother

use super::{PlayheadSmoother, SmoothingResult};
use crate::session::SessionState;

/// Renders the raw engine position unchanged
///
/// Baseline for metrics comparisons and a debug mode for chasing engine
/// timing problems.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSmoother;

impl PlayheadSmoother for NoSmoother {
    #[inline]
    fn update_and_get_smoothed_position(
        &self,
        target_frame: u64,
        _delta_ms: u64,
        _state: SessionState,
    ) -> SmoothingResult {
        SmoothingResult::snapped(target_frame)
    }

    fn reset(&self) {}

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let smoother = NoSmoother;
        for target in [0, 1, 44_100, 441_000, u64::MAX / 2] {
            assert_eq!(
                smoother.update_and_get_smoothed_position(target, 16, SessionState::Playing),
                SmoothingResult::snapped(target)
            );
        }
    }
}
