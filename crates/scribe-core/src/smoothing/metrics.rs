//! Smoothness scoring over a sliding window of samples
//!
//! Scores:
//! - **SPARC**: arc length of the velocity profile, normalized by duration
//!   over distance and negated. Lower is smoother.
//! - **Jerk RMS**: RMS of the third finite difference of position.
//! - **Lag**: average, p95, p99 and max of `target - position`, counting
//!   only samples behind the target, in milliseconds.
//! - **Overshoot**: percentage of consecutive sample pairs where the
//!   smoother went from behind the target to ahead of it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::types::NOMINAL_SAMPLE_RATE;

/// Samples needed before any score is produced
pub const MIN_SAMPLES: usize = 10;

/// Default sliding window size
pub const DEFAULT_WINDOW: usize = 100;

/// One observation of smoother output against the engine target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSample {
    pub timestamp_ms: u64,
    pub position: u64,
    pub target_position: u64,
}

impl PositionSample {
    /// Frames behind the target (negative when ahead)
    #[inline]
    fn lag_frames(&self) -> i64 {
        self.target_position as i64 - self.position as i64
    }
}

/// Scores computed from the current window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothnessScores {
    pub sparc: f64,
    pub jerk_rms: f64,
    pub lag_ms: f64,
    pub p95_lag_ms: f64,
    pub p99_lag_ms: f64,
    pub max_lag_ms: f64,
    /// Percentage in `[0, 100]`
    pub overshoot_percent: f64,
    pub sample_count: usize,
}

/// Thread-safe sliding window of [`PositionSample`]s
pub struct SmoothingMetrics {
    max_samples: usize,
    sample_rate: AtomicU32,
    samples: Mutex<VecDeque<PositionSample>>,
}

impl SmoothingMetrics {
    /// Window of `max_samples` at the nominal sample rate
    pub fn new(max_samples: usize) -> Self {
        Self::with_sample_rate(max_samples, NOMINAL_SAMPLE_RATE)
    }

    /// Window whose lag figures convert frames to ms at `sample_rate`
    pub fn with_sample_rate(max_samples: usize, sample_rate: u32) -> Self {
        let max_samples = max_samples.max(MIN_SAMPLES);
        Self {
            max_samples,
            sample_rate: AtomicU32::new(effective_rate(sample_rate)),
            samples: Mutex::new(VecDeque::with_capacity(max_samples)),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Follow the rate of the loaded file (0 means nominal)
    ///
    /// Samples collected at another rate are discarded.
    pub fn set_sample_rate(&self, sample_rate: u32) {
        let sample_rate = effective_rate(sample_rate);
        if self.sample_rate.swap(sample_rate, Ordering::Relaxed) != sample_rate {
            log::debug!("set_sample_rate: metrics now at {} Hz", sample_rate);
            self.reset();
        }
    }

    pub fn add_sample(&self, timestamp_ms: u64, smoothed_position: u64, target_position: u64) {
        let mut samples = self.samples.lock();
        samples.push_back(PositionSample {
            timestamp_ms,
            position: smoothed_position,
            target_position,
        });
        while samples.len() > self.max_samples {
            samples.pop_front();
        }
    }

    /// Scores for the current window, or `None` below [`MIN_SAMPLES`]
    pub fn calculate_scores(&self) -> Option<SmoothnessScores> {
        let samples: Vec<PositionSample> = {
            let guard = self.samples.lock();
            if guard.len() < MIN_SAMPLES {
                return None;
            }
            guard.iter().copied().collect()
        };

        let lags = self.sorted_positive_lags_ms(&samples);
        let lag_ms = if lags.is_empty() {
            0.0
        } else {
            lags.iter().sum::<f64>() / lags.len() as f64
        };

        Some(SmoothnessScores {
            sparc: sparc(&samples),
            jerk_rms: jerk_rms(&samples),
            lag_ms,
            p95_lag_ms: percentile(&lags, 0.95),
            p99_lag_ms: percentile(&lags, 0.99),
            max_lag_ms: lags.last().copied().unwrap_or(0.0),
            overshoot_percent: overshoot_percent(&samples),
            sample_count: samples.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    pub fn reset(&self) {
        self.samples.lock().clear();
    }

    fn sorted_positive_lags_ms(&self, samples: &[PositionSample]) -> Vec<f64> {
        let frames_per_ms = self.sample_rate() as f64 / 1000.0;
        let mut lags: Vec<f64> = samples
            .iter()
            .map(PositionSample::lag_frames)
            .filter(|lag| *lag > 0)
            .map(|lag| lag as f64 / frames_per_ms)
            .collect();
        lags.sort_by(f64::total_cmp);
        lags
    }
}

fn effective_rate(sample_rate: u32) -> u32 {
    if sample_rate == 0 {
        NOMINAL_SAMPLE_RATE
    } else {
        sample_rate
    }
}

fn sparc(samples: &[PositionSample]) -> f64 {
    if samples.len() < 3 {
        return f64::NAN;
    }

    let velocities: Vec<f64> = samples
        .windows(2)
        .map(|pair| {
            let dt = pair[1].timestamp_ms.saturating_sub(pair[0].timestamp_ms);
            if dt > 0 {
                (pair[1].position as f64 - pair[0].position as f64) / dt as f64
            } else {
                0.0
            }
        })
        .collect();

    let arc_length: f64 = velocities
        .windows(2)
        .map(|pair| {
            let dv = pair[1] - pair[0];
            (1.0 + dv * dv).sqrt()
        })
        .sum();

    let first = samples[0];
    let last = samples[samples.len() - 1];
    let duration = last.timestamp_ms.saturating_sub(first.timestamp_ms);
    let distance = last.position.abs_diff(first.position);

    if duration > 0 && distance > 0 {
        -arc_length * duration as f64 / distance as f64
    } else {
        0.0
    }
}

fn jerk_rms(samples: &[PositionSample]) -> f64 {
    if samples.len() < 4 {
        return f64::NAN;
    }

    let mut sum = 0.0;
    let mut count = 0usize;
    for w in samples.windows(4) {
        let span = w[3].timestamp_ms.saturating_sub(w[0].timestamp_ms);
        if span == 0 {
            continue;
        }
        let dt = span as f64 / 3.0;
        let [p0, p1, p2, p3] = [w[0], w[1], w[2], w[3]].map(|s| s.position as f64);
        let jerk = (p3 - 3.0 * p2 + 3.0 * p1 - p0) / (dt * dt * dt);
        sum += jerk * jerk;
        count += 1;
    }

    if count > 0 {
        (sum / count as f64).sqrt()
    } else {
        0.0
    }
}

/// Nearest-rank percentile of a sorted slice (0 when empty)
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

fn overshoot_percent(samples: &[PositionSample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|pair| pair[0].lag_frames() > 0 && pair[1].lag_frames() < 0)
        .count();
    100.0 * crossings as f64 / (samples.len() - 1) as f64
}
