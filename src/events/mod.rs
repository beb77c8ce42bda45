//! Event data model, listener matching and publisher plumbing.
//!
//! This module groups the value types threads and external callers exchange
//! with the engine, and the synchronous fan-out used to deliver selected
//! events and snapshots.
//!
//! ## Contents
//! - [`Event`], [`EventTemplate`], [`Request`] — the communication unit and
//!   its lazy form
//! - [`Listener`] — waitFor/block/interrupt predicates
//! - [`Disconnect`] — subscription handle (publisher itself is internal)
//!
//! ## Quick reference
//! - **Producers**: thread requests (via `Idiom`), external `Trigger` calls,
//!   `Signal` change forwarding.
//! - **Consumers**: the selector (candidate collection and listener
//!   matching), feedback handlers, snapshot listeners.

mod event;
mod listener;
mod publisher;

pub use event::{Event, EventTemplate, Request};
pub use listener::Listener;
pub use publisher::Disconnect;

pub(crate) use publisher::Publisher;
