//! # Bid records and thread identity.
//!
//! The engine tracks every live thread in exactly one of two ordered
//! registries:
//!
//! - **running** — threads about to be resumed ([`RunningBid`])
//! - **pending** — threads that yielded a statement and wait for a matching
//!   event ([`PendingBid`])
//!
//! A [`CandidateBid`] is the per-step flattening of a pending request,
//! produced fresh during each selection phase and discarded afterwards.
//!
//! Registered threads carry author-assigned names; trigger-originated threads
//! get an opaque [`ThreadId::Ephemeral`] token from a per-program monotonic
//! counter, so injected events can never collide with author names.

use std::fmt;
use std::rc::Rc;

use crate::events::{Event, EventTemplate};
use crate::threads::{Idiom, Rules};

/// Identity of a live thread.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub(crate) enum ThreadId {
    /// Author-assigned name, unique within the registry.
    Named(Rc<str>),
    /// Generated token for a trigger-originated thread.
    Ephemeral { seq: u64, event_type: Rc<str> },
}

impl ThreadId {
    pub(crate) fn is_named(&self, name: &str) -> bool {
        matches!(self, ThreadId::Named(n) if n.as_ref() == name)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadId::Named(name) => f.write_str(name),
            ThreadId::Ephemeral { seq, event_type } => write!(f, "trigger({event_type}#{seq})"),
        }
    }
}

/// A thread scheduled for resumption.
///
/// `rules` is `None` once the computation has been terminated by an
/// interrupt; such a record is discarded on its next pass through the resume
/// phase without being resumed.
pub(crate) struct RunningBid {
    pub(crate) id: ThreadId,
    pub(crate) priority: usize,
    pub(crate) is_trigger: bool,
    pub(crate) rules: Option<Rules>,
}

/// A thread parked at a synchronization point, carrying its declared intent.
pub(crate) struct PendingBid {
    pub(crate) id: ThreadId,
    pub(crate) priority: usize,
    pub(crate) is_trigger: bool,
    pub(crate) rules: Option<Rules>,
    pub(crate) idiom: Idiom,
}

/// One flattened request considered for selection in a single super-step.
#[derive(Clone)]
pub(crate) struct CandidateBid {
    pub(crate) id: ThreadId,
    pub(crate) priority: usize,
    pub(crate) is_trigger: bool,
    pub(crate) event: Event,
    /// Set when the request was a template; identity links the selected event
    /// back to the requesting thread.
    pub(crate) template: Option<EventTemplate>,
}

/// Introspection result for a named thread.
///
/// Exactly one flag is true while the thread is alive; both are false once it
/// has completed or been interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadStatus {
    /// Thread is scheduled for resumption.
    pub running: bool,
    /// Thread is parked at a synchronization point.
    pub pending: bool,
}

impl ThreadStatus {
    /// True once the thread has completed or been interrupted.
    #[inline]
    pub fn is_done(&self) -> bool {
        !self.running && !self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_ids_render_with_seq_and_type() {
        let id = ThreadId::Ephemeral {
            seq: 3,
            event_type: Rc::from("X"),
        };
        assert_eq!(id.to_string(), "trigger(X#3)");
        assert!(!id.is_named("X"));
    }

    #[test]
    fn named_id_matches_its_name_only() {
        let id = ThreadId::Named(Rc::from("enforce-turns"));
        assert!(id.is_named("enforce-turns"));
        assert!(!id.is_named("enforce"));
        assert_eq!(id.to_string(), "enforce-turns");
    }
}
