//! # Synchronization statement (idiom).
//!
//! An [`Idiom`] is the value a b-thread yields each time it reaches a
//! synchronization point. It declares, for the coming super-steps:
//!
//! - `request` — at most one event (or template) the thread proposes,
//! - `wait_for` — listeners whose match resumes the thread,
//! - `block` — listeners that veto matching candidates program-wide,
//! - `interrupt` — listeners whose match terminates the thread.
//!
//! "At most one request" is enforced structurally: the field is an `Option`,
//! and calling [`request`](Idiom::request) again replaces the previous value.
//!
//! ## Example
//! ```rust
//! use behavisor::{Event, Idiom};
//!
//! // Wait for X while vetoing O — one half of a turn-taking protocol.
//! let statement = Idiom::new().wait_for("X").block("O");
//! assert!(statement.request.is_none());
//! assert_eq!(statement.wait_for.len(), 1);
//!
//! let bid = Idiom::new().request(Event::new("win"));
//! assert!(bid.request.is_some());
//! ```

use crate::events::{Listener, Request};

/// Declaration of intent yielded by a thread at a synchronization point.
#[derive(Debug, Clone, Default)]
pub struct Idiom {
    /// Event the thread proposes for selection, if any.
    pub request: Option<Request>,
    /// Listeners whose match moves the thread back to running.
    pub wait_for: Vec<Listener>,
    /// Listeners that remove matching candidates from selection.
    pub block: Vec<Listener>,
    /// Listeners whose match terminates the thread.
    pub interrupt: Vec<Listener>,
}

impl Idiom {
    /// Creates an empty statement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the requested event. A second call replaces the first; a
    /// statement never carries more than one request.
    pub fn request(mut self, request: impl Into<Request>) -> Self {
        self.request = Some(request.into());
        self
    }

    /// Adds a waitFor listener. May be called multiple times.
    pub fn wait_for(mut self, listener: impl Into<Listener>) -> Self {
        self.wait_for.push(listener.into());
        self
    }

    /// Adds a block listener. May be called multiple times.
    pub fn block(mut self, listener: impl Into<Listener>) -> Self {
        self.block.push(listener.into());
        self
    }

    /// Adds an interrupt listener. May be called multiple times.
    pub fn interrupt(mut self, listener: impl Into<Listener>) -> Self {
        self.interrupt.push(listener.into());
        self
    }
}
