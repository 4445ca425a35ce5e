//! Session notifications
//!
//! Every lifecycle change is published as a [`SessionEvent`] on an
//! [`EventBus`]. Each subscriber has its own bounded queue and sees every
//! event published after it subscribed. Publishing never blocks: the manager
//! publishes from the engine callback thread too, and a subscriber whose
//! queue is full misses the event.

use std::path::PathBuf;

use crossbeam::channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use super::SessionState;

/// Context attached to a state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatePayload {
    None,
    /// A file finished loading
    FileLoaded(PathBuf),
    /// Playback started or resumed at this frame
    Position(u64),
    /// Stopped on request
    Stopped,
    /// Reached the end of the requested range
    Completed,
    Error(String),
}

/// Events broadcast by the session manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged {
        previous: SessionState,
        current: SessionState,
        payload: StatePayload,
    },

    /// Playhead moved by a seek; `deferred` when stored for the next play
    Seeked { frame: u64, deferred: bool },
}

impl SessionEvent {
    pub fn is_transition_to_playing(&self) -> bool {
        matches!(
            self,
            SessionEvent::StateChanged {
                current: SessionState::Playing,
                ..
            }
        )
    }

    pub fn is_transition_to_paused(&self) -> bool {
        matches!(
            self,
            SessionEvent::StateChanged {
                current: SessionState::Paused,
                ..
            }
        )
    }

    /// LOADING -> READY
    pub fn is_audio_loaded(&self) -> bool {
        matches!(
            self,
            SessionEvent::StateChanged {
                previous: SessionState::Loading,
                current: SessionState::Ready,
                ..
            }
        )
    }

    pub fn is_playback_completed(&self) -> bool {
        matches!(
            self,
            SessionEvent::StateChanged {
                payload: StatePayload::Completed,
                ..
            }
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            SessionEvent::StateChanged {
                current: SessionState::Error,
                ..
            }
        )
    }
}

/// Broadcasts session events to every subscriber
pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<SessionEvent>>>,
}

impl EventBus {
    /// Create a bus whose subscribers each buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Get a receiver for all events published from now on
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (sender, receiver) = crossbeam::channel::bounded(self.capacity);
        self.subscribers.lock().push(sender);
        receiver
    }

    /// Deliver to every live subscriber without blocking
    ///
    /// Dropped receivers are pruned. Returns how many subscribers got the
    /// event.
    pub fn publish(&self, event: SessionEvent) -> usize {
        let mut delivered = 0;
        self.subscribers.lock().retain(|sender| match sender.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(event)) => {
                log::warn!("publish: subscriber queue full, dropping {:?}", event);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
