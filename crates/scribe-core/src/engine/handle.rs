//! Opaque engine handles and metadata

use std::fmt;

/// Token for a loaded audio file, issued by the engine
///
/// The session only stores it and hands it back; the value carries no meaning
/// outside the engine that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioHandle(u64);

impl AudioHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audio#{}", self.0)
    }
}

/// Token for an active playback channel (playing or paused)
///
/// Released by the engine on stop; any later use yields
/// [`EngineError::InvalidHandle`](super::EngineError::InvalidHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(u64);

impl PlaybackHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "playback#{}", self.0)
    }
}

/// Properties of a loaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMetadata {
    pub sample_rate: u32,
    pub frame_count: u64,
}

impl AudioMetadata {
    pub fn duration_seconds(&self) -> f64 {
        crate::types::frames_to_seconds(self.frame_count, self.sample_rate)
    }
}

/// Transport state of a playback channel as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    /// Reached the end frame on its own
    Finished,
    Error,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Stopped => "stopped",
            PlaybackState::Finished => "finished",
            PlaybackState::Error => "error",
        };
        f.write_str(name)
    }
}
