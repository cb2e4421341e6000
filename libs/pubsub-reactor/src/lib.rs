//! Test-side synchronization with the broker emulator.
//!
//! A [`Waiter`] is a one-shot promise keyed by a target string in a
//! [`WaiterSupervisor`]. The [`AckReactor`] watches the emulator's
//! acknowledgement traffic and resolves the ack and nack waiters an
//! [`AckSupervisor`] started for a subscription, so a test can block
//! until a message it published has actually been settled.

pub mod ack;
pub mod log;
pub mod supervisor;
pub mod waiter;

pub use ack::AckReactor;
pub use log::{LOGGED_METHODS, LogReactor};
pub use supervisor::{AckSupervisor, WaiterSupervisor};
pub use waiter::{Outcome, SharedError, WaitError, Waiter};
