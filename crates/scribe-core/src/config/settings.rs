//! Configuration sections

use serde::{Deserialize, Serialize};

use crate::session::DEFAULT_EVENT_CAPACITY;
use crate::smoothing::{SmootherKind, DEFAULT_LOG_INTERVAL, DEFAULT_WINDOW};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    /// Playhead smoothing used by the waveform view
    pub smoothing: SmoothingConfig,
    /// Transport behaviour
    pub playback: PlaybackConfig,
}

/// Playhead smoothing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Algorithm: none, linear-interpolation, predictive-extrapolation or
    /// phase-locked-loop
    pub kind: SmootherKind,
    /// Record smoothness metrics while playing
    pub collect_metrics: bool,
    /// Samples kept in the metrics window
    pub metrics_window: usize,
    /// Samples between debug metric reports (0 = never)
    pub metrics_log_interval: u64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            kind: SmootherKind::default(),
            collect_metrics: false,
            metrics_window: DEFAULT_WINDOW,
            metrics_log_interval: DEFAULT_LOG_INTERVAL,
        }
    }
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Length of the "replay last" gesture
    pub replay_window_ms: u64,
    /// Step for relative seeks (arrow keys)
    pub seek_step_ms: u64,
    /// Capacity of the session event bus
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            replay_window_ms: 200,
            seek_step_ms: 5_000,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
