//! Immutable session snapshots

use std::path::{Path, PathBuf};

use super::{SessionCommand, SessionState};
use crate::engine::{AudioHandle, PlaybackHandle};
use crate::types::frames_to_seconds;

/// Complete, immutable view of a session at one instant
///
/// The lifecycle state travels with the data it governs, so a reader can
/// never see PLAYING without the matching playback handle. A context is
/// created once with [`create_initial`](Self::create_initial) and afterwards
/// only replaced by [`apply`](Self::apply).
///
/// Invariants upheld by `apply` when driven along legal transitions:
/// - a playback handle implies an audio handle
/// - PLAYING/PAUSED exactly when a playback handle is present
/// - `total_frames` and `sample_rate` are 0 exactly when no audio handle is held
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionContext {
    state: SessionState,
    current_file: Option<PathBuf>,
    audio_handle: Option<AudioHandle>,
    playback_handle: Option<PlaybackHandle>,
    pending_start_frame: Option<u64>,
    playhead_frame: u64,
    total_frames: u64,
    sample_rate: u32,
    error_message: Option<String>,
    seek_count: u64,
}

impl SessionContext {
    /// Context of a session with nothing loaded
    pub fn create_initial() -> Self {
        Self::default()
    }

    /// Produce the context that follows `command`
    ///
    /// Total and side-effect free. Legality is checked by the caller before
    /// the command is applied.
    pub fn apply(&self, command: &SessionCommand) -> SessionContext {
        match command {
            SessionCommand::BeginLoad { file } => SessionContext {
                state: SessionState::Loading,
                current_file: Some(file.clone()),
                ..SessionContext::default()
            },
            SessionCommand::LoadFile {
                file,
                audio_handle,
                total_frames,
                sample_rate,
            } => SessionContext {
                state: SessionState::Ready,
                current_file: Some(file.clone()),
                audio_handle: Some(*audio_handle),
                total_frames: *total_frames,
                sample_rate: *sample_rate,
                ..SessionContext::default()
            },
            SessionCommand::CloseFile => SessionContext::create_initial(),
            SessionCommand::SetLoadError { message } => SessionContext {
                state: SessionState::Error,
                current_file: self.current_file.clone(),
                error_message: Some(message.clone()),
                ..SessionContext::default()
            },
            SessionCommand::StartPlayback {
                playback_handle,
                start_frame,
            } => SessionContext {
                state: SessionState::Playing,
                playback_handle: Some(*playback_handle),
                pending_start_frame: None,
                playhead_frame: *start_frame,
                ..self.clone()
            },
            SessionCommand::PausePlayback { position_frames } => SessionContext {
                state: SessionState::Paused,
                playhead_frame: *position_frames,
                ..self.clone()
            },
            SessionCommand::ResumePlayback { position_frames } => SessionContext {
                state: SessionState::Playing,
                playhead_frame: *position_frames,
                ..self.clone()
            },
            SessionCommand::StopPlayback => SessionContext {
                state: SessionState::Ready,
                playback_handle: None,
                pending_start_frame: None,
                playhead_frame: 0,
                ..self.clone()
            },
            SessionCommand::SetPendingSeek { target_frame } => SessionContext {
                pending_start_frame: Some(*target_frame),
                seek_count: self.seek_count.wrapping_add(1),
                ..self.clone()
            },
            SessionCommand::SeekPlayback { target_frame } => SessionContext {
                playhead_frame: *target_frame,
                seek_count: self.seek_count.wrapping_add(1),
                ..self.clone()
            },
            SessionCommand::ClearPendingSeek => SessionContext {
                pending_start_frame: None,
                ..self.clone()
            },
            SessionCommand::UpdatePosition { position_frames } => SessionContext {
                playhead_frame: *position_frames,
                ..self.clone()
            },
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_file(&self) -> Option<&Path> {
        self.current_file.as_deref()
    }

    #[inline]
    pub fn audio_handle(&self) -> Option<AudioHandle> {
        self.audio_handle
    }

    #[inline]
    pub fn playback_handle(&self) -> Option<PlaybackHandle> {
        self.playback_handle
    }

    #[inline]
    pub fn pending_start_frame(&self) -> Option<u64> {
        self.pending_start_frame
    }

    #[inline]
    pub fn playhead_frame(&self) -> u64 {
        self.playhead_frame
    }

    #[inline]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Bumped by every user seek; a change means the playhead jumped
    #[inline]
    pub fn seek_count(&self) -> u64 {
        self.seek_count
    }

    pub fn playhead_seconds(&self) -> f64 {
        frames_to_seconds(self.playhead_frame, self.sample_rate)
    }

    pub fn total_duration_seconds(&self) -> f64 {
        frames_to_seconds(self.total_frames, self.sample_rate)
    }
}
