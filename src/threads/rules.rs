//! # Thread bodies: rules, sequencing and repetition.
//!
//! A b-thread's computation is any iterator of [`Idiom`]s: each call to
//! `next()` resumes the thread until its next synchronization point, and
//! `None` means the thread completed. The engine owns the iterator and is the
//! only caller of `next()`.
//!
//! Two helpers cover the common authoring shapes:
//! - [`b_sync`] — a rule yielding exactly one statement;
//! - [`b_thread`] — sequences rule factories, optionally repeating. Each
//!   repetition pass re-invokes every factory, so per-pass state inside a
//!   rule starts fresh.
//!
//! Hand-written iterators (including `std::iter::from_fn` state machines) are
//! equally valid thread bodies for logic that does not fit a fixed rule list.
//!
//! ## Example
//! ```rust
//! use behavisor::{b_sync, b_thread, Idiom, Repeat};
//!
//! // Alternate waitFor X / waitFor O forever.
//! let enforce_turns = b_thread(
//!     vec![
//!         b_sync(Idiom::new().wait_for("X").block("O")),
//!         b_sync(Idiom::new().wait_for("O").block("X")),
//!     ],
//!     Repeat::Forever,
//! );
//! # drop(enforce_turns);
//! ```

use std::rc::Rc;

use crate::threads::Idiom;

/// A resumable thread body. `next()` runs the thread to its next
/// synchronization point; `None` means normal completion.
pub type Rules = Box<dyn Iterator<Item = Idiom>>;

/// A rule factory: invoked once per pass to produce a fresh segment of the
/// thread body.
pub type RuleFn = Rc<dyn Fn() -> Rules>;

/// Repetition mode for [`b_thread`].
#[derive(Clone)]
pub enum Repeat {
    /// Run the rule list once.
    No,
    /// Cycle the rule list indefinitely.
    Forever,
    /// Evaluate the guard before every pass (including the first); stop when
    /// it returns false.
    While(Rc<dyn Fn() -> bool>),
}

impl Repeat {
    /// Convenience constructor for [`Repeat::While`].
    pub fn when(guard: impl Fn() -> bool + 'static) -> Self {
        Repeat::While(Rc::new(guard))
    }
}

/// A rule yielding a single synchronization statement.
pub fn b_sync(idiom: Idiom) -> RuleFn {
    Rc::new(move || Box::new(std::iter::once(idiom.clone())) as Rules)
}

/// Sequences rule factories into one thread body, optionally repeating.
pub fn b_thread(rules: Vec<RuleFn>, repeat: Repeat) -> Rules {
    Box::new(ThreadRules {
        rules,
        repeat,
        index: 0,
        current: None,
        pass_started: false,
        done: false,
    })
}

/// Explicit state machine driving a rule list through zero or more passes.
struct ThreadRules {
    rules: Vec<RuleFn>,
    repeat: Repeat,
    index: usize,
    current: Option<Rules>,
    pass_started: bool,
    done: bool,
}

impl Iterator for ThreadRules {
    type Item = Idiom;

    fn next(&mut self) -> Option<Idiom> {
        loop {
            if self.done {
                return None;
            }
            if let Some(current) = self.current.as_mut() {
                if let Some(idiom) = current.next() {
                    return Some(idiom);
                }
                self.current = None;
                self.index += 1;
                continue;
            }
            if self.index == 0 && !self.pass_started {
                let proceed = match &self.repeat {
                    Repeat::While(guard) => guard(),
                    Repeat::No | Repeat::Forever => true,
                };
                if !proceed || self.rules.is_empty() {
                    self.done = true;
                    return None;
                }
                self.pass_started = true;
            }
            if self.index >= self.rules.len() {
                match self.repeat {
                    Repeat::No => {
                        self.done = true;
                        return None;
                    }
                    Repeat::Forever | Repeat::While(_) => {
                        self.index = 0;
                        self.pass_started = false;
                        continue;
                    }
                }
            }
            self.current = Some((self.rules[self.index])());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, Request};

    fn requested(idiom: Option<Idiom>) -> String {
        match idiom.and_then(|i| i.request) {
            Some(Request::Event(ev)) => ev.event_type,
            other => panic!("expected a concrete request, got {other:?}"),
        }
    }

    fn req(event_type: &str) -> RuleFn {
        b_sync(Idiom::new().request(Event::new(event_type)))
    }

    #[test]
    fn executes_rules_sequentially() {
        let mut thread = b_thread(vec![req("event1"), req("event2"), req("event3")], Repeat::No);
        assert_eq!(requested(thread.next()), "event1");
        assert_eq!(requested(thread.next()), "event2");
        assert_eq!(requested(thread.next()), "event3");
        assert!(thread.next().is_none());
        assert!(thread.next().is_none());
    }

    #[test]
    fn repeats_forever_cycling_the_rule_list() {
        let mut thread = b_thread(vec![req("a"), req("b")], Repeat::Forever);
        for _ in 0..3 {
            assert_eq!(requested(thread.next()), "a");
            assert_eq!(requested(thread.next()), "b");
        }
    }

    #[test]
    fn while_guard_is_checked_before_every_pass() {
        let remaining = Rc::new(std::cell::Cell::new(2u32));
        let guard = Rc::clone(&remaining);
        let mut thread = b_thread(
            vec![req("tick")],
            Repeat::when(move || {
                if guard.get() == 0 {
                    return false;
                }
                guard.set(guard.get() - 1);
                true
            }),
        );
        assert_eq!(requested(thread.next()), "tick");
        assert_eq!(requested(thread.next()), "tick");
        assert!(thread.next().is_none());
    }

    #[test]
    fn while_guard_false_upfront_yields_nothing() {
        let mut thread = b_thread(vec![req("never")], Repeat::when(|| false));
        assert!(thread.next().is_none());
    }

    #[test]
    fn empty_rule_list_completes_immediately() {
        let mut thread = b_thread(vec![], Repeat::Forever);
        assert!(thread.next().is_none());
    }

    #[test]
    fn multi_statement_rule_factories_are_flattened_in_order() {
        let pair: RuleFn = Rc::new(|| {
            Box::new(
                vec![
                    Idiom::new().request(Event::new("x1")),
                    Idiom::new().request(Event::new("x2")),
                ]
                .into_iter(),
            ) as Rules
        });
        let mut thread = b_thread(vec![pair, req("y")], Repeat::No);
        assert_eq!(requested(thread.next()), "x1");
        assert_eq!(requested(thread.next()), "x2");
        assert_eq!(requested(thread.next()), "y");
        assert!(thread.next().is_none());
    }
}
