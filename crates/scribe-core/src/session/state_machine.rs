//! Lock-free standalone lifecycle tracker
//!
//! [`SessionStateMachine`] holds only a [`SessionState`] in an atomic cell.
//! Every transition is a compare-and-swap loop validated against the graph,
//! so concurrent callers can never observe or produce an illegal edge.

use std::sync::atomic::{AtomicU8, Ordering};

use super::{SessionError, SessionResult, SessionState};

/// Atomic cell holding the current lifecycle state
#[derive(Debug)]
pub struct SessionStateMachine {
    state: AtomicU8,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::with_state(SessionState::NoAudio)
    }

    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: AtomicU8::new(state as u8),
        }
    }

    #[inline]
    pub fn current_state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Replace `expected` with `new` if it is still current
    ///
    /// Does not consult the transition graph; returns whether the swap won.
    pub fn compare_and_set(&self, expected: SessionState, new: SessionState) -> bool {
        self.state
            .compare_exchange(
                expected as u8,
                new as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `next` if the current state allows it
    ///
    /// Returns the state that was left.
    pub fn transition_to(&self, next: SessionState) -> SessionResult<SessionState> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let from = SessionState::from_u8(current);
            from.transition(next)?;
            match self.state.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    log::debug!("transition_to: {} -> {}", from, next);
                    return Ok(from);
                }
                Err(actual) => current = actual,
            }
        }
    }

    pub fn transition_to_loading(&self) -> SessionResult<SessionState> {
        self.transition_to(SessionState::Loading)
    }

    pub fn transition_to_ready(&self) -> SessionResult<SessionState> {
        self.transition_to(SessionState::Ready)
    }

    pub fn transition_to_playing(&self) -> SessionResult<SessionState> {
        self.transition_to(SessionState::Playing)
    }

    pub fn transition_to_paused(&self) -> SessionResult<SessionState> {
        self.transition_to(SessionState::Paused)
    }

    pub fn transition_to_error(&self) -> SessionResult<SessionState> {
        self.transition_to(SessionState::Error)
    }

    pub fn transition_to_no_audio(&self) -> SessionResult<SessionState> {
        self.transition_to(SessionState::NoAudio)
    }

    /// Enter ERROR from any state, bypassing the graph
    ///
    /// Idempotent. Returns the previous state.
    pub fn force_error(&self) -> SessionState {
        let previous =
            SessionState::from_u8(self.state.swap(SessionState::Error as u8, Ordering::AcqRel));
        if previous != SessionState::Error {
            log::warn!("force_error: {} -> ERROR", previous);
        }
        previous
    }

    /// Return to NO_AUDIO from any state
    pub fn reset(&self) {
        self.state.store(SessionState::NoAudio as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_state(&self, state: SessionState) -> bool {
        self.current_state() == state
    }

    /// Ok if the current state is one of `allowed`
    pub fn check_state_any(&self, allowed: &[SessionState]) -> SessionResult<SessionState> {
        let current = self.current_state();
        if allowed.contains(&current) {
            Ok(current)
        } else {
            Err(SessionError::IllegalTransition {
                from: current,
                to: allowed.first().copied().unwrap_or(current),
            })
        }
    }

    #[inline]
    pub fn is_audio_loaded(&self) -> bool {
        self.current_state().is_audio_loaded()
    }

    #[inline]
    pub fn is_playback_active(&self) -> bool {
        self.current_state().is_playback_active()
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
