//! # Publisher: ordered fan-out to subscribed callbacks.
//!
//! [`Publisher`] distributes each published value to every subscribed
//! listener, synchronously, in subscription order. It is the delivery
//! mechanism behind both the feedback channel (selected events) and the
//! snapshot channel (per-step reports).
//!
//! ## What it guarantees
//! - Delivery order across listeners is subscription order.
//! - Listeners may re-enter the engine (e.g. call a `Trigger`) during
//!   delivery: the listener list is snapshotted before the pass, so
//!   subscription changes made by a listener take effect from the next
//!   publication onward.
//!
//! ## What it does **not** guarantee
//! - No panic isolation: a listener that panics propagates to the caller
//!   (fail-fast, same contract as thread bodies).

use std::cell::RefCell;
use std::rc::Rc;

/// Handle returned by a subscription; consumes itself to unsubscribe.
///
/// Dropping a `Disconnect` without calling [`disconnect`](Self::disconnect)
/// leaves the subscription alive for the lifetime of the program, matching
/// the fire-and-forget registration the feedback API allows.
pub struct Disconnect(Option<Box<dyn FnOnce()>>);

impl Disconnect {
    pub(crate) fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// Removes the subscription this handle was returned for.
    pub fn disconnect(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

struct Inner<T> {
    next_id: u64,
    listeners: Vec<(u64, Rc<dyn Fn(&T)>)>,
}

/// Synchronous multi-listener channel. Cloning shares the listener set.
pub(crate) struct Publisher<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Publisher<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Registers a listener; the returned handle removes it again.
    pub(crate) fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Disconnect {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Rc::new(listener)));
            id
        };
        let weak = Rc::downgrade(&self.inner);
        Disconnect::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Delivers `value` to a snapshot of the current listeners, in order.
    pub(crate) fn publish(&self, value: &T) {
        let listeners: Vec<Rc<dyn Fn(&T)>> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(value);
        }
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_subscription_order() {
        let publisher: Publisher<u32> = Publisher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let a = Rc::clone(&seen);
        let _keep_a = publisher.subscribe(move |v| a.borrow_mut().push(("a", *v)));
        let b = Rc::clone(&seen);
        let _keep_b = publisher.subscribe(move |v| b.borrow_mut().push(("b", *v)));

        publisher.publish(&1);
        assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn disconnect_removes_only_its_listener() {
        let publisher: Publisher<u32> = Publisher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let a = Rc::clone(&seen);
        let first = publisher.subscribe(move |v| a.borrow_mut().push(("a", *v)));
        let b = Rc::clone(&seen);
        let _keep_b = publisher.subscribe(move |v| b.borrow_mut().push(("b", *v)));

        first.disconnect();
        publisher.publish(&2);
        assert_eq!(*seen.borrow(), vec![("b", 2)]);
        assert_eq!(publisher.listener_count(), 1);
    }

    #[test]
    fn listener_subscribing_during_publish_is_deferred_to_next_pass() {
        let publisher: Publisher<u32> = Publisher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let p = publisher.clone();
        let outer = Rc::clone(&seen);
        let _keep = publisher.subscribe(move |v| {
            outer.borrow_mut().push(("outer", *v));
            let inner = Rc::clone(&outer);
            // Keep the nested subscription alive by leaking its handle.
            std::mem::forget(p.subscribe(move |v| inner.borrow_mut().push(("inner", *v))));
        });

        publisher.publish(&1);
        assert_eq!(*seen.borrow(), vec![("outer", 1)]);

        seen.borrow_mut().clear();
        publisher.publish(&2);
        assert_eq!(seen.borrow().first(), Some(&("outer", 2)));
        assert!(seen.borrow().contains(&("inner", 2)));
    }
}
