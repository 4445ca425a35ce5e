//! Session commands
//!
//! Every lifecycle mutation is one of these variants. Commands are plain
//! data: applying one to a [`SessionContext`](super::SessionContext) is a
//! pure function, and all engine I/O happens in the manager around it.

use std::path::PathBuf;

use crate::engine::{AudioHandle, PlaybackHandle};

/// A discrete lifecycle event applied to a session context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    // ─────────────────────────────────────────────────────────────
    // File lifecycle
    // ─────────────────────────────────────────────────────────────
    /// Loading of `file` has started (enters LOADING)
    BeginLoad { file: PathBuf },

    /// Loading finished; the file is ready to play (enters READY)
    LoadFile {
        file: PathBuf,
        audio_handle: AudioHandle,
        total_frames: u64,
        sample_rate: u32,
    },

    /// Drop the current file and return to the initial context
    CloseFile,

    /// Loading or playback failed (enters ERROR, keeps the file path)
    SetLoadError { message: String },

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────
    /// Playback started on a new channel (enters PLAYING)
    StartPlayback {
        playback_handle: PlaybackHandle,
        start_frame: u64,
    },

    /// Playback paused at the engine-reported position (enters PAUSED)
    PausePlayback { position_frames: u64 },

    /// Playback resumed from the given position (enters PLAYING)
    ResumePlayback { position_frames: u64 },

    /// Channel released (enters READY, rewinds to frame 0)
    StopPlayback,

    // ─────────────────────────────────────────────────────────────
    // Position
    // ─────────────────────────────────────────────────────────────
    /// Remember a start frame for the next play (seek while stopped)
    SetPendingSeek { target_frame: u64 },

    /// The active channel was moved to `target_frame` by the user
    SeekPlayback { target_frame: u64 },

    ClearPendingSeek,

    /// Engine-reported or seeked playhead position
    UpdatePosition { position_frames: u64 },
}

impl SessionCommand {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            SessionCommand::BeginLoad { .. } => "BeginLoad",
            SessionCommand::LoadFile { .. } => "LoadFile",
            SessionCommand::CloseFile => "CloseFile",
            SessionCommand::SetLoadError { .. } => "SetLoadError",
            SessionCommand::StartPlayback { .. } => "StartPlayback",
            SessionCommand::PausePlayback { .. } => "PausePlayback",
            SessionCommand::ResumePlayback { .. } => "ResumePlayback",
            SessionCommand::StopPlayback => "StopPlayback",
            SessionCommand::SetPendingSeek { .. } => "SetPendingSeek",
            SessionCommand::SeekPlayback { .. } => "SeekPlayback",
            SessionCommand::ClearPendingSeek => "ClearPendingSeek",
            SessionCommand::UpdatePosition { .. } => "UpdatePosition",
        }
    }
}
