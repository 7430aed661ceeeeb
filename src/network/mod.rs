// network/mod.rs - Message Transport

//! In-process message transport between agents.
//!
//! Every agent owns a [`Mailbox`]; the [`MessageBus`] routes messages to the
//! mailboxes of all receivers. Delivery is asynchronous and unacknowledged,
//! and receiving never waits.

mod bus;

pub use bus::{Mailbox, MessageBus};
