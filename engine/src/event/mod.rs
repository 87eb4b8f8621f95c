//! Buffered event streams.
//!
//! Events are plain values pushed into a per-type [`Channel`] and read through
//! per-reader [`Cursor`]s. Channels are double-buffered: an event survives the
//! frame it was sent in plus the following one, then is dropped on the next
//! [`Channel::update`]. Readers that poll at least once per frame never miss an
//! event; a reader that falls further behind skips ahead to the oldest retained
//! event.

pub mod broker;
pub mod channel;

pub use broker::Broker;
pub use channel::{Channel, Cursor};

/// Marker trait for event payloads. Implement with `#[derive(Event)]`.
pub trait Event: Send + Sync + 'static {}
