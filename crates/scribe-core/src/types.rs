//! Core types used throughout the session and smoothing layers

/// Sample rate assumed when no audio metadata is available
pub const NOMINAL_SAMPLE_RATE: u32 = 44_100;

/// Frames per millisecond at the nominal sample rate
pub const NOMINAL_FRAMES_PER_MS: f64 = NOMINAL_SAMPLE_RATE as f64 / 1000.0;

/// Direction of a relative seek
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// Convert a frame position to seconds
///
/// Returns 0.0 when the sample rate is unknown (no audio loaded).
#[inline]
pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}

/// Convert seconds to a frame position, rounding to the nearest frame
#[inline]
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    if seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as u64
}

/// Convert a duration in milliseconds to frames
#[inline]
pub fn millis_to_frames(millis: u64, sample_rate: u32) -> u64 {
    // u128 keeps huge durations from overflowing before the division
    (millis as u128 * sample_rate as u128 / 1000).min(u64::MAX as u128) as u64
}

/// Clamp a frame into `[0, total_frames - 1]`
///
/// With no frames loaded the only valid position is 0.
#[inline]
pub fn clamp_frame(frame: u64, total_frames: u64) -> u64 {
    frame.min(total_frames.saturating_sub(1))
}
