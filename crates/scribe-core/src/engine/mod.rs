//! Audio engine adapter boundary
//!
//! The session layer never touches audio devices directly. Everything it
//! needs from the native backend goes through the [`AudioEngine`] trait:
//! handle-based loading, transport control and a listener registration for
//! position callbacks delivered on the backend's own thread.
//!
//! [`SimulatedEngine`] implements the trait without a device so sessions can
//! be driven deterministically from tests and the headless harness.

mod adapter;
mod error;
mod handle;
mod listener;
mod simulated;

pub use adapter::*;
pub use error::*;
pub use handle::*;
pub use listener::*;
pub use simulated::*;
