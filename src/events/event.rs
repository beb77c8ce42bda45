//! # Event data model.
//!
//! An [`Event`] is the unit of communication between b-threads and the outside
//! world: a type string plus an optional JSON detail payload. Events are plain
//! values; the engine never mutates one after it has been selected.
//!
//! A [`Request`] is what a thread puts on the table at a synchronization
//! point: either a ready-made [`Event`] or an [`EventTemplate`] that the
//! selector evaluates lazily, exactly once per super-step, so the payload can
//! depend on state captured at selection time.
//!
//! ## Example
//! ```rust
//! use behavisor::Event;
//! use serde_json::json;
//!
//! let ev = Event::new("X").with_detail(json!({ "square": 4 }));
//! assert_eq!(ev.event_type, "X");
//! assert_eq!(ev.detail.as_ref().unwrap()["square"], 4);
//! ```

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event: a type string and an optional dynamic detail payload.
///
/// Matching is by `event_type` unless a predicate [`Listener`](crate::Listener)
/// inspects the detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event classification, e.g. `"X"`, `"win"`, `"add-hot"`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Optional payload. `None` is delivered to feedback handlers as JSON null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl Event {
    /// Creates an event of the given type with no detail.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            detail: None,
        }
    }

    /// Attaches a detail payload.
    #[inline]
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}({detail})", self.event_type),
            None => f.write_str(&self.event_type),
        }
    }
}

/// A lazily evaluated event producer.
///
/// The selector calls the closure once per super-step when collecting
/// candidates. Template identity (used to decide whether a selected candidate
/// was produced by a given thread's own request) is pointer identity of the
/// underlying closure, so clones of one template compare equal.
#[derive(Clone)]
pub struct EventTemplate(Rc<dyn Fn() -> Event>);

impl EventTemplate {
    /// Wraps a closure as a template.
    pub fn new(f: impl Fn() -> Event + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Evaluates the template, producing a fresh event.
    #[inline]
    pub fn produce(&self) -> Event {
        (self.0)()
    }

    /// Identity comparison: true when both wrap the same closure.
    #[inline]
    pub fn same_as(&self, other: &EventTemplate) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventTemplate(..)")
    }
}

/// A thread's request at a synchronization point: a concrete event or a
/// template resolved at selection time.
#[derive(Debug, Clone)]
pub enum Request {
    /// Fixed event, known when the statement is authored.
    Event(Event),
    /// Deferred event, produced during the selection phase.
    Template(EventTemplate),
}

impl From<Event> for Request {
    fn from(event: Event) -> Self {
        Request::Event(event)
    }
}

impl From<EventTemplate> for Request {
    fn from(template: EventTemplate) -> Self {
        Request::Template(template)
    }
}
