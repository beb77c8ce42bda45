//! # Signals: observable state bridged into programs as events.
//!
//! A [`Signal`] holds a current value and forwards every update into one or
//! more behavioral programs: [`Signal::listen`] wires the signal to a
//! [`Trigger`], and from then on each [`Signal::set`] injects an event whose
//! detail is the serialized value. Threads consume signal updates like any
//! other event, so external state never needs a side channel into thread
//! bodies.
//!
//! Values must serialize to JSON to travel as event details; an update whose
//! value fails to serialize is dropped with a warning rather than injected
//! half-formed.
//!
//! ## Example
//! ```rust
//! use behavisor::{BProgram, Event, Handlers, Signal};
//!
//! let program = BProgram::new();
//! let level = Signal::new(0u32);
//!
//! // Deliver the current value immediately, then every update.
//! let _wire = level.listen("level-changed", &program.handle(), true);
//!
//! let _sub = program.use_feedback(
//!     Handlers::new().on("level-changed", |detail| println!("level: {detail}")),
//! );
//! level.set(3);
//! assert_eq!(level.get(), 3);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tracing::warn;

use crate::core::Trigger;
use crate::events::{Disconnect, Event, Publisher};

/// Observable value with last-value-cache semantics.
///
/// Cloning shares the underlying state: all clones see the same value and the
/// same listener set.
pub struct Signal<T> {
    value: Rc<RefCell<T>>,
    updates: Publisher<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            updates: self.updates.clone(),
        }
    }
}

impl<T: Clone + Serialize + 'static> Signal<T> {
    /// Creates a signal holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            value: Rc::new(RefCell::new(initial)),
            updates: Publisher::new(),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }

    /// Stores `next` and delivers it to every listener.
    ///
    /// Listeners run after the store, so a thread reacting to the update
    /// observes the new value through [`get`](Self::get).
    pub fn set(&self, next: T) {
        *self.value.borrow_mut() = next.clone();
        self.updates.publish(&next);
    }

    /// Forwards updates into a program as `event_type` events.
    ///
    /// With `get_current` set, the present value is injected immediately, so
    /// late subscribers start from the last value instead of waiting for the
    /// next change. The returned handle unsubscribes.
    pub fn listen(
        &self,
        event_type: impl Into<String>,
        trigger: &Trigger,
        get_current: bool,
    ) -> Disconnect {
        let event_type = event_type.into();
        let trigger = trigger.clone();
        if get_current {
            deliver(&event_type, &trigger, &self.get());
        }
        self.updates
            .subscribe(move |value: &T| deliver(&event_type, &trigger, value))
    }
}

/// Serializes `value` and injects it; a serialization failure drops the
/// update.
fn deliver<T: Serialize>(event_type: &str, trigger: &Trigger, value: &T) {
    match serde_json::to_value(value) {
        Ok(detail) => trigger.trigger(Event::new(event_type).with_detail(detail)),
        Err(error) => {
            warn!(%error, event_type, "signal value not serializable; update dropped");
        }
    }
}
