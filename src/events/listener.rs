//! # Listener matching.
//!
//! A [`Listener`] decides whether a candidate event satisfies a `wait_for`,
//! `block` or `interrupt` declaration. Two forms exist:
//!
//! - **Type listener** — matches when the event's type string is equal.
//! - **Predicate listener** — an arbitrary closure over the whole event,
//!   free to inspect the detail payload.
//!
//! The same type is used for all three declaration kinds; only the engine
//! phase in which a match is consulted differs.
//!
//! ## Example
//! ```rust
//! use behavisor::{Event, Listener};
//! use serde_json::json;
//!
//! let by_type = Listener::from("X");
//! let by_detail = Listener::matching(|ev| {
//!     ev.event_type == "X" && ev.detail.as_ref().is_some_and(|d| d["square"] == 4)
//! });
//!
//! let ev = Event::new("X").with_detail(json!({ "square": 4 }));
//! assert!(by_type.matches(&ev));
//! assert!(by_detail.matches(&ev));
//! ```

use std::fmt;
use std::rc::Rc;

use crate::events::Event;

/// Predicate over candidate events, used uniformly for waitFor/block/interrupt.
#[derive(Clone)]
pub enum Listener {
    /// Exact match on the event type string.
    Type(String),
    /// Arbitrary predicate over the event.
    Where(Rc<dyn Fn(&Event) -> bool>),
}

impl Listener {
    /// Creates a type-string listener.
    pub fn of_type(event_type: impl Into<String>) -> Self {
        Listener::Type(event_type.into())
    }

    /// Creates a predicate listener.
    pub fn matching(f: impl Fn(&Event) -> bool + 'static) -> Self {
        Listener::Where(Rc::new(f))
    }

    /// A listener that matches every event.
    ///
    /// The trigger gateway uses this so an ephemeral thread retires after the
    /// step that considered its event, whatever was selected.
    pub fn any() -> Self {
        Listener::Where(Rc::new(|_| true))
    }

    /// Evaluates the listener against a candidate event.
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Listener::Type(t) => *t == event.event_type,
            Listener::Where(f) => f(event),
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Type(t) => write!(f, "Listener::Type({t:?})"),
            Listener::Where(_) => f.write_str("Listener::Where(..)"),
        }
    }
}

impl From<&str> for Listener {
    fn from(event_type: &str) -> Self {
        Listener::of_type(event_type)
    }
}

impl From<String> for Listener {
    fn from(event_type: String) -> Self {
        Listener::Type(event_type)
    }
}
