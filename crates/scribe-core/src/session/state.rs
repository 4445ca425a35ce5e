//! Session lifecycle states and the legal transition graph

use std::fmt;

use super::{SessionError, SessionResult};

/// Lifecycle state of an audio session
///
/// ```text
/// NO_AUDIO -> LOADING
/// LOADING  -> READY | ERROR
/// READY    -> PLAYING | NO_AUDIO
/// PLAYING  -> PAUSED | READY | ERROR
/// PAUSED   -> PLAYING | READY
/// ERROR    -> NO_AUDIO | LOADING
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SessionState {
    #[default]
    NoAudio = 0,
    Loading = 1,
    Ready = 2,
    Playing = 3,
    Paused = 4,
    Error = 5,
}

impl SessionState {
    pub const ALL: [SessionState; 6] = [
        SessionState::NoAudio,
        SessionState::Loading,
        SessionState::Ready,
        SessionState::Playing,
        SessionState::Paused,
        SessionState::Error,
    ];

    /// Whether `self -> next` is an edge of the transition graph
    pub const fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (NoAudio, Loading)
                | (Loading, Ready)
                | (Loading, Error)
                | (Ready, Playing)
                | (Ready, NoAudio)
                | (Playing, Paused)
                | (Playing, Ready)
                | (Playing, Error)
                | (Paused, Playing)
                | (Paused, Ready)
                | (Error, NoAudio)
                | (Error, Loading)
        )
    }

    /// Validate `self -> next`, returning `next` when legal
    pub fn transition(self, next: SessionState) -> SessionResult<SessionState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SessionError::IllegalTransition {
                from: self,
                to: next,
            })
        }
    }

    /// READY, PLAYING or PAUSED
    #[inline]
    pub const fn is_audio_loaded(self) -> bool {
        matches!(
            self,
            SessionState::Ready | SessionState::Playing | SessionState::Paused
        )
    }

    /// PLAYING or PAUSED (a playback handle exists)
    #[inline]
    pub const fn is_playback_active(self) -> bool {
        matches!(self, SessionState::Playing | SessionState::Paused)
    }

    pub(crate) const fn from_u8(value: u8) -> SessionState {
        match value {
            1 => SessionState::Loading,
            2 => SessionState::Ready,
            3 => SessionState::Playing,
            4 => SessionState::Paused,
            5 => SessionState::Error,
            _ => SessionState::NoAudio,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SessionState::NoAudio => "NO_AUDIO",
            SessionState::Loading => "LOADING",
            SessionState::Ready => "READY",
            SessionState::Playing => "PLAYING",
            SessionState::Paused => "PAUSED",
            SessionState::Error => "ERROR",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
