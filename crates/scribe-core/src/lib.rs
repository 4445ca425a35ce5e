//! Scribe Core - audio session lifecycle and playhead smoothing
//!
//! This crate provides the playback core used by the Scribe annotation tool:
//! - Session state machine with immutable context snapshots
//! - Session manager that drives an audio engine adapter
//! - Playhead smoothers that turn bursty engine positions into 60fps motion
//! - Smoothness metrics for comparing smoother quality
//! - Viewport driving (per-paint playback following)
//! - YAML configuration

pub mod clock;
pub mod config;
pub mod engine;
pub mod session;
pub mod smoothing;
pub mod types;
pub mod viewport;
