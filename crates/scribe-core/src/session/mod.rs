//! Audio session lifecycle
//!
//! A session moves through the states in [`SessionState`] along a fixed
//! transition graph. The full session (state, file, handles, positions) lives
//! in an immutable [`SessionContext`] that is only ever replaced, never
//! mutated, by applying a [`SessionCommand`]. [`SessionManager`] is the single
//! writer: it validates intents against the graph, drives the audio engine
//! and publishes [`SessionEvent`]s on an [`EventBus`].
//!
//! # Example
//!
//! ```ignore
//! let manager = SessionManager::new(engine);
//! let events = manager.subscribe();
//!
//! manager.load("interview.wav")?;
//! manager.seek(100_000)?;   // READY: deferred until play
//! manager.play()?;          // starts at frame 100_000
//! ```

mod command;
mod context;
mod error;
mod events;
mod manager;
mod state;
mod state_machine;

pub use command::*;
pub use context::*;
pub use error::*;
pub use events::*;
pub use manager::*;
pub use state::*;
pub use state_machine::*;
