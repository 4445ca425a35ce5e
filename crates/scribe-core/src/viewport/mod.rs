//! Waveform viewport driving
//!
//! Once per paint cycle the render loop asks a [`PlaybackFollower`] to tick.
//! The follower reads the current session snapshot, runs the configured
//! smoother through a [`ViewportProjector`] and hands the smoothed playhead to
//! the [`Viewport`].

mod follower;
mod projector;

pub use follower::*;
pub use projector::*;
