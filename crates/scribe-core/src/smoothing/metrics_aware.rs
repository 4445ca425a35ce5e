//! Metrics-collecting smoother decorator

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::{PlayheadSmoother, SmoothingMetrics, SmoothingResult, SmoothnessScores, MIN_SAMPLES};
use crate::clock::Clock;
use crate::session::SessionState;

/// Samples between periodic debug reports
pub const DEFAULT_LOG_INTERVAL: u64 = 600;

/// Wraps a smoother and records every PLAYING result for scoring
///
/// Smoothing output is passed through untouched; toggling collection never
/// changes what is rendered.
pub struct MetricsAwarePlayheadSmoother<S = Box<dyn PlayheadSmoother>> {
    delegate: S,
    metrics: SmoothingMetrics,
    enabled: AtomicBool,
    clock: Arc<dyn Clock>,
    samples_seen: AtomicU64,
    log_interval: u64,
}

impl<S: PlayheadSmoother> MetricsAwarePlayheadSmoother<S> {
    pub fn new(delegate: S, window: usize, clock: Arc<dyn Clock>) -> Self {
        Self::with_metrics(delegate, SmoothingMetrics::new(window), clock)
    }

    /// Use a preconfigured metrics window (e.g. for a non-nominal sample rate)
    pub fn with_metrics(delegate: S, metrics: SmoothingMetrics, clock: Arc<dyn Clock>) -> Self {
        Self {
            delegate,
            metrics,
            enabled: AtomicBool::new(true),
            clock,
            samples_seen: AtomicU64::new(0),
            log_interval: DEFAULT_LOG_INTERVAL,
        }
    }

    /// Log scores every `interval` samples (0 disables)
    pub fn with_log_interval(mut self, interval: u64) -> Self {
        self.log_interval = interval;
        self
    }

    /// Turning collection off also discards the collected window
    pub fn set_metrics_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.metrics.reset();
        }
    }

    pub fn metrics_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn smoothness_scores(&self) -> Option<SmoothnessScores> {
        self.metrics.calculate_scores()
    }

    pub fn metrics(&self) -> &SmoothingMetrics {
        &self.metrics
    }

    pub fn delegate(&self) -> &S {
        &self.delegate
    }

    /// Human-readable summary of the current scores
    pub fn metrics_report(&self) -> String {
        let Some(scores) = self.metrics.calculate_scores() else {
            return format!(
                "Insufficient data for metrics (need at least {} samples)",
                MIN_SAMPLES
            );
        };

        format!(
            "Smoothness Metrics Report:\n\
             \x20 SPARC Score: {:.3} (lower is smoother)\n\
             \x20 Jerk RMS: {:.3} (lower is smoother)\n\
             \x20 Average Lag: {:.1} ms\n\
             \x20 P95 Lag: {:.1} ms\n\
             \x20 P99 Lag: {:.1} ms\n\
             \x20 Max Lag: {:.1} ms\n\
             \x20 Overshoot: {:.1}%\n\
             \x20 Sample Count: {}\n\
             \x20 Smoother Type: {}",
            scores.sparc,
            scores.jerk_rms,
            scores.lag_ms,
            scores.p95_lag_ms,
            scores.p99_lag_ms,
            scores.max_lag_ms,
            scores.overshoot_percent,
            scores.sample_count,
            self.delegate.name()
        )
    }

    fn log_scores(&self) {
        if let Some(scores) = self.metrics.calculate_scores() {
            log::debug!(
                "[SMOOTHING] {}: SPARC {:.3}, jerk {:.3}, lag {:.1}ms (p95 {:.1}ms), overshoot {:.1}%",
                self.delegate.name(),
                scores.sparc,
                scores.jerk_rms,
                scores.lag_ms,
                scores.p95_lag_ms,
                scores.overshoot_percent
            );
        }
    }
}

impl<S: PlayheadSmoother> PlayheadSmoother for MetricsAwarePlayheadSmoother<S> {
    fn update_and_get_smoothed_position(
        &self,
        target_frame: u64,
        delta_ms: u64,
        state: SessionState,
    ) -> SmoothingResult {
        let result =
            self.delegate.update_and_get_smoothed_position(target_frame, delta_ms, state);

        if state == SessionState::Playing && self.metrics_enabled() {
            self.metrics.add_sample(self.clock.now_ms(), result.smoothed_frame, target_frame);

            let seen = self.samples_seen.fetch_add(1, Ordering::Relaxed) + 1;
            if self.log_interval > 0 && seen % self.log_interval == 0 {
                self.log_scores();
            }
        }

        result
    }

    fn reset(&self) {
        self.delegate.reset();
        self.metrics.reset();
        log::debug!("Metrics-aware smoother reset");
    }

    fn set_sample_rate(&self, sample_rate: u32) {
        self.delegate.set_sample_rate(sample_rate);
        self.metrics.set_sample_rate(sample_rate);
    }

    fn name(&self) -> &'static str {
        "metrics-aware"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::smoothing::{NoSmoother, PredictiveExtrapolationSmoother};

    fn drive<S: PlayheadSmoother>(smoother: &S, clock: &ManualClock, ticks: u64, state: SessionState) {
        for i in 0..ticks {
            clock.advance(16);
            smoother.update_and_get_smoothed_position(i * 706, 16, state);
        }
    }

    #[test]
    fn test_passes_results_through() {
        let clock = Arc::new(ManualClock::new(0));
        let plain = PredictiveExtrapolationSmoother::new(clock.clone());
        let wrapped = MetricsAwarePlayheadSmoother::new(
            PredictiveExtrapolationSmoother::new(clock.clone()),
            100,
            clock.clone(),
        );

        for i in 0..50u64 {
            clock.advance(16);
            let target = i * 700 + (i % 3) * 40;
            assert_eq!(
                wrapped.update_and_get_smoothed_position(target, 16, SessionState::Playing),
                plain.update_and_get_smoothed_position(target, 16, SessionState::Playing)
            );
        }
    }

    #[test]
    fn test_collects_only_while_playing() {
        let clock = Arc::new(ManualClock::new(0));
        let smoother = MetricsAwarePlayheadSmoother::new(NoSmoother, 100, clock.clone());

        drive(&smoother, &clock, 30, SessionState::Paused);
        assert!(smoother.metrics().is_empty());

        drive(&smoother, &clock, 30, SessionState::Playing);
        assert_eq!(smoother.metrics().len(), 30);
        let scores = smoother.smoothness_scores().unwrap();
        assert_eq!(scores.lag_ms, 0.0);
        assert_eq!(scores.overshoot_percent, 0.0);
    }

    #[test]
    fn test_disabling_discards_window() {
        let clock = Arc::new(ManualClock::new(0));
        let smoother = MetricsAwarePlayheadSmoother::new(NoSmoother, 100, clock.clone());
        drive(&smoother, &clock, 20, SessionState::Playing);

        smoother.set_metrics_enabled(false);
        assert!(smoother.metrics().is_empty());
        drive(&smoother, &clock, 20, SessionState::Playing);
        assert!(smoother.metrics().is_empty());

        smoother.set_metrics_enabled(true);
        drive(&smoother, &clock, 5, SessionState::Playing);
        assert_eq!(smoother.metrics().len(), 5);
    }

    #[test]
    fn test_report() {
        let clock = Arc::new(ManualClock::new(0));
        let delegate: Box<dyn PlayheadSmoother> = Box::new(NoSmoother);
        let smoother = MetricsAwarePlayheadSmoother::new(delegate, 100, clock.clone());

        assert_eq!(
            smoother.metrics_report(),
            "Insufficient data for metrics (need at least 10 samples)"
        );

        drive(&smoother, &clock, 12, SessionState::Playing);
        let report = smoother.metrics_report();
        assert!(report.starts_with("Smoothness Metrics Report:"));
        assert!(report.contains("  Sample Count: 12"));
        assert!(report.contains("  Smoother Type: none"));
    }

    #[test]
    fn test_reset_clears_metrics() {
        let clock = Arc::new(ManualClock::new(0));
        let smoother = MetricsAwarePlayheadSmoother::new(NoSmoother, 100, clock.clone())
            .with_log_interval(5);
        drive(&smoother, &clock, 12, SessionState::Playing);
        smoother.reset();
        assert!(smoother.smoothness_scores().is_none());
        assert!(smoother.metrics_enabled());
    }

    #[test]
    fn test_lag_follows_file_sample_rate() {
        let clock = Arc::new(ManualClock::new(0));
        let smoother = MetricsAwarePlayheadSmoother::new(LaggingSmoother, 100, clock.clone());
        drive(&smoother, &clock, 20, SessionState::Playing);
        let nominal_lag = smoother.smoothness_scores().unwrap().lag_ms;
        assert!((nominal_lag - 480.0 / 44.1).abs() < 1e-9);

        // A 48kHz file: same frame lag, shorter in time
        smoother.set_sample_rate(48_000);
        assert!(smoother.metrics().is_empty());
        drive(&smoother, &clock, 20, SessionState::Playing);
        assert!((smoother.smoothness_scores().unwrap().lag_ms - 10.0).abs() < 1e-9);
    }

    /// Renders a fixed 480 frames behind the target
    struct LaggingSmoother;

    impl PlayheadSmoother for LaggingSmoother {
        fn update_and_get_smoothed_position(
            &self,
            target_frame: u64,
            _delta_ms: u64,
            _state: SessionState,
        ) -> SmoothingResult {
            SmoothingResult::new(target_frame.saturating_sub(480), target_frame)
        }

        fn reset(&self) {}

        fn name(&self) -> &'static str {
            "lagging"
        }
    }
}
