//! # Behavioral program: registries, super-step loop and public operations.
//!
//! [`BProgram`] owns the two ordered thread registries (*running* and
//! *pending*) and drives the super-step state machine:
//!
//! ```text
//! Idle ──trigger/registered work──► Stepping ──► Selecting ──► Notifying ─┐
//!   ▲                                   ▲                                │
//!   │        no candidate selected      │        winner published        │
//!   └───────────────────────────────────┴────────────────────────────────┘
//! ```
//!
//! Per super-step:
//! 1. **Resume** every running thread once, in insertion order; yielded
//!    statements park the thread in pending, completion drops it.
//! 2. **Select**: collect block listeners and flatten requests into
//!    candidates (templates resolved once), discard blocked candidates, pick
//!    the lowest priority; ties go to the candidate collected first.
//! 3. **Snapshot** (when subscribed): publish the pre-notification report.
//! 4. **Notify**: interrupt-matched threads are terminated (their iterator is
//!    dropped — `Drop` is the finalizer) and cycled through running for
//!    removal; request/waitFor-matched threads move back to running.
//! 5. **Feedback**: publish the winner to feedback subscribers.
//!
//! The loop repeats while anything is running and simply returns to idle when
//! a step selects nothing. Feedback and snapshot listeners may call a
//! [`Trigger`] re-entrantly; every piece of user code (thread bodies,
//! predicates, templates, listeners, finalizers) runs with no internal borrow
//! held, so nested injection drives nested super-steps instead of panicking.
//!
//! Panics in user code are not caught: recovery belongs to the author, not to
//! a synchronization engine.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::core::bids::{CandidateBid, PendingBid, RunningBid, ThreadId, ThreadStatus};
use crate::core::snapshot::{format_snapshot, SnapshotMessage};
use crate::error::TriggerError;
use crate::events::{Disconnect, Event, Listener, Publisher, Request};
use crate::threads::{Idiom, Rules};

/// Cloned view of one pending thread's declaration.
///
/// The selector and the snapshot formatter work on these copies so that user
/// predicates and templates run without the core borrowed.
pub(crate) struct PendingDecl {
    pub(crate) id: ThreadId,
    pub(crate) priority: usize,
    pub(crate) is_trigger: bool,
    pub(crate) idiom: Idiom,
}

/// Mutable engine state. Exclusively owned by [`BProgram`]; every public
/// operation goes through short, scoped borrows.
struct Core {
    running: Vec<RunningBid>,
    pending: Vec<PendingBid>,
    feedback: Publisher<Event>,
    /// Created on first snapshot subscription, torn down with the last one.
    snapshot: Option<Publisher<SnapshotMessage>>,
    trigger_seq: u64,
}

impl Core {
    fn new() -> Self {
        Self {
            running: Vec::new(),
            pending: Vec::new(),
            feedback: Publisher::new(),
            snapshot: None,
            trigger_seq: 0,
        }
    }

    fn live_threads(&self) -> usize {
        self.running.len() + self.pending.len()
    }

    fn decls(&self) -> Vec<PendingDecl> {
        self.pending
            .iter()
            .map(|bid| PendingDecl {
                id: bid.id.clone(),
                priority: bid.priority,
                is_trigger: bid.is_trigger,
                idiom: bid.idiom.clone(),
            })
            .collect()
    }
}

/// A behavioral program instance.
///
/// Each instance is fully independent — no global state — so tests and
/// embedders can construct as many as they need.
///
/// # Example
/// ```rust
/// use behavisor::{b_sync, b_thread, BProgram, Event, Handlers, Idiom, Repeat};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let program = BProgram::new();
/// program.register(vec![(
///     "enforce-turns",
///     b_thread(
///         vec![
///             b_sync(Idiom::new().wait_for("X").block("O")),
///             b_sync(Idiom::new().wait_for("O").block("X")),
///         ],
///         Repeat::Forever,
///     ),
/// )]);
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let seen = Rc::clone(&log);
/// let _sub = program.use_feedback(
///     Handlers::new().on("X", move |_| seen.borrow_mut().push("X")),
/// );
///
/// program.trigger(Event::new("X"));
/// program.trigger(Event::new("X")); // out of turn: vetoed, nothing selected
/// assert_eq!(log.borrow().len(), 1);
/// ```
pub struct BProgram {
    core: Rc<RefCell<Core>>,
}

impl Default for BProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl BProgram {
    /// Creates an empty program with no threads and no subscribers.
    pub fn new() -> Self {
        Self {
            core: Rc::new(RefCell::new(Core::new())),
        }
    }

    /// Returns a cloneable injector for this program.
    ///
    /// The handle holds a weak reference: triggering after the program has
    /// been dropped is a no-op. This keeps feedback handlers that capture a
    /// handle from pinning the program alive through a reference cycle.
    pub fn handle(&self) -> Trigger {
        Trigger {
            core: Rc::downgrade(&self.core),
        }
    }

    /// Returns an injector restricted to an allow list of event types.
    ///
    /// This is the surface to hand to untrusted collaborators (UI bindings,
    /// transports): anything outside `public_events` is rejected instead of
    /// entering the program.
    pub fn public_handle(
        &self,
        public_events: impl IntoIterator<Item = impl Into<String>>,
    ) -> PublicTrigger {
        PublicTrigger {
            inner: self.handle(),
            allowed: public_events.into_iter().map(Into::into).collect(),
        }
    }

    /// Injects an external event at the highest priority.
    ///
    /// The event is wrapped as a one-shot ephemeral thread whose single
    /// statement requests it and waits for anything, so it is guaranteed to
    /// be a candidate in the very next selection phase (though an active
    /// block may still veto it) and the wrapper retires after the first step
    /// that selects any event.
    pub fn trigger(&self, event: Event) {
        inject(&self.core, event);
    }

    /// Adds or replaces named threads, placing each in *running*.
    ///
    /// Priorities are assigned as live-thread-count + 1 at insertion, so
    /// earlier registrations take precedence. Re-registering a name replaces
    /// the previous thread: its computation is dropped on the spot (`Drop`
    /// runs; nothing else is guaranteed) and a warning is logged.
    /// Registration alone does not advance the program; the next trigger
    /// does.
    pub fn register<N, I>(&self, threads: I)
    where
        N: Into<Rc<str>>,
        I: IntoIterator<Item = (N, Rules)>,
    {
        let mut replaced: Vec<Rules> = Vec::new();
        {
            let mut core = self.core.borrow_mut();
            for (name, rules) in threads {
                let name: Rc<str> = name.into();
                let mut old: Option<Rules> = None;
                if let Some(pos) = core.running.iter().position(|b| b.id.is_named(&name)) {
                    old = core.running.remove(pos).rules;
                }
                if let Some(pos) = core.pending.iter().position(|b| b.id.is_named(&name)) {
                    old = old.or(core.pending.remove(pos).rules);
                }
                if old.is_some() {
                    warn!(thread = %name, "replacing existing thread; previous computation dropped");
                }
                replaced.extend(old);

                let priority = core.live_threads() + 1;
                debug!(thread = %name, priority, "thread registered");
                core.running.push(RunningBid {
                    id: ThreadId::Named(name),
                    priority,
                    is_trigger: false,
                    rules: Some(rules),
                });
            }
        }
        // Old computations are dropped with no borrow held; their finalizers
        // may use a Trigger.
        drop(replaced);
    }

    /// Reports whether the named thread is currently running or pending.
    pub fn status(&self, name: &str) -> ThreadStatus {
        let core = self.core.borrow();
        ThreadStatus {
            running: core.running.iter().any(|b| b.id.is_named(name)),
            pending: core.pending.iter().any(|b| b.id.is_named(name)),
        }
    }

    /// Subscribes feedback handlers to selected events.
    ///
    /// Every selected event whose type matches a handler key delivers the
    /// event's detail (JSON null when absent) to that handler. Subscriptions
    /// coexist and are served in registration order. Handlers may trigger
    /// further events; those drive nested super-steps synchronously.
    pub fn use_feedback(&self, handlers: Handlers) -> Disconnect {
        let feedback = self.core.borrow().feedback.clone();
        let entries = handlers.entries;
        feedback.subscribe(move |event: &Event| {
            let detail = event.detail.clone().unwrap_or(Value::Null);
            for (event_type, handler) in &entries {
                if *event_type == event.event_type {
                    handler(&detail);
                }
            }
        })
    }

    /// Subscribes a listener to per-step snapshot reports.
    ///
    /// The snapshot channel is created lazily on the first subscription and
    /// torn down when the last listener disconnects, so idle programs pay
    /// nothing for introspection. For each step that selects a winner the
    /// report is published before feedback.
    pub fn use_snapshot(&self, listener: impl Fn(&SnapshotMessage) + 'static) -> Disconnect {
        let publisher = {
            let mut core = self.core.borrow_mut();
            core.snapshot.get_or_insert_with(Publisher::new).clone()
        };
        debug!("snapshot listener subscribed");
        let subscription = publisher.subscribe(listener);
        let weak = Rc::downgrade(&self.core);
        Disconnect::new(move || {
            subscription.disconnect();
            if let Some(core) = weak.upgrade() {
                let mut core = core.borrow_mut();
                if core
                    .snapshot
                    .as_ref()
                    .is_some_and(|p| p.listener_count() == 0)
                {
                    core.snapshot = None;
                    debug!("snapshot channel torn down");
                }
            }
        })
    }
}

/// Cloneable, weakly held event injector.
#[derive(Clone)]
pub struct Trigger {
    core: Weak<RefCell<Core>>,
}

impl Trigger {
    /// Injects an event; no-op if the program has been dropped.
    pub fn trigger(&self, event: Event) {
        if let Some(core) = self.core.upgrade() {
            inject(&core, event);
        }
    }
}

/// Injector restricted to an allow list of event types.
pub struct PublicTrigger {
    inner: Trigger,
    allowed: HashSet<String>,
}

impl PublicTrigger {
    /// Injects the event when its type is on the allow list.
    pub fn trigger(&self, event: Event) -> Result<(), TriggerError> {
        if self.allowed.contains(&event.event_type) {
            self.inner.trigger(event);
            Ok(())
        } else {
            Err(TriggerError::NotPublic {
                event_type: event.event_type,
            })
        }
    }
}

/// Feedback handler table: event type → callback over the event detail.
///
/// # Example
/// ```rust
/// use behavisor::Handlers;
///
/// let handlers = Handlers::new()
///     .on("X", |detail| println!("X took {detail}"))
///     .on("win", |detail| println!("winner: {detail}"));
/// # drop(handlers);
/// ```
#[derive(Default)]
pub struct Handlers {
    entries: Vec<(String, Rc<dyn Fn(&Value)>)>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for one event type. Repeated `on` calls for the
    /// same type all fire, in registration order.
    pub fn on(mut self, event_type: impl Into<String>, handler: impl Fn(&Value) + 'static) -> Self {
        self.entries.push((event_type.into(), Rc::new(handler)));
        self
    }
}

/// Wraps an external event as a one-shot highest-priority thread and runs the
/// machine to quiescence.
fn inject(core: &Rc<RefCell<Core>>, event: Event) {
    {
        let mut c = core.borrow_mut();
        let seq = c.trigger_seq;
        c.trigger_seq += 1;
        trace!(event = %event, seq, "external event injected");
        let id = ThreadId::Ephemeral {
            seq,
            event_type: Rc::from(event.event_type.as_str()),
        };
        let statement = Idiom::new().request(event).wait_for(Listener::any());
        c.running.push(RunningBid {
            id,
            priority: 0,
            is_trigger: true,
            rules: Some(Box::new(std::iter::once(statement))),
        });
    }
    run(core);
}

/// Trampolined super-step loop: resume → select → snapshot → notify →
/// feedback, repeated while any thread is running. A call with nothing
/// running performs no state mutation and publishes nothing.
fn run(core: &Rc<RefCell<Core>>) {
    loop {
        let to_resume = std::mem::take(&mut core.borrow_mut().running);
        if to_resume.is_empty() {
            break;
        }

        // Resume phase. Thread bodies run with no borrow held.
        let mut newly_pending = Vec::new();
        for mut bid in to_resume {
            let Some(mut rules) = bid.rules.take() else {
                // Interrupted last step; record retires here.
                trace!(thread = %bid.id, "terminated thread removed");
                continue;
            };
            match rules.next() {
                Some(idiom) => newly_pending.push(PendingBid {
                    id: bid.id,
                    priority: bid.priority,
                    is_trigger: bid.is_trigger,
                    rules: Some(rules),
                    idiom,
                }),
                None => trace!(thread = %bid.id, "thread completed"),
            }
        }
        core.borrow_mut().pending.append(&mut newly_pending);

        // Selection phase.
        let Some((winner, candidates, decls)) = select_next_event(core) else {
            trace!("no candidate selected; program idle");
            break;
        };

        // Snapshot precedes notification and feedback for the same step.
        let snapshot_publisher = core.borrow().snapshot.clone();
        if let Some(publisher) = snapshot_publisher {
            publisher.publish(&format_snapshot(&candidates, &winner, &decls));
        }

        notify(core, &winner);

        trace!(
            event = %winner.event,
            thread = %winner.id,
            priority = winner.priority,
            "event selected"
        );
        let feedback = core.borrow().feedback.clone();
        feedback.publish(&winner.event);
    }
}

/// Selection phase: flatten pending requests into candidates, veto blocked
/// ones, pick the winner.
///
/// Returns the winner together with the full candidate list and the pending
/// declarations, both needed by the snapshot formatter.
fn select_next_event(
    core: &Rc<RefCell<Core>>,
) -> Option<(CandidateBid, Vec<CandidateBid>, Vec<PendingDecl>)> {
    let decls = core.borrow().decls();

    // Templates and predicates are user code; evaluated with no borrow held.
    let mut blocked: Vec<Listener> = Vec::new();
    let mut candidates: Vec<CandidateBid> = Vec::new();
    for decl in &decls {
        blocked.extend(decl.idiom.block.iter().cloned());
        if let Some(request) = &decl.idiom.request {
            let (event, template) = match request {
                Request::Event(event) => (event.clone(), None),
                Request::Template(template) => (template.produce(), Some(template.clone())),
            };
            candidates.push(CandidateBid {
                id: decl.id.clone(),
                priority: decl.priority,
                is_trigger: decl.is_trigger,
                event,
                template,
            });
        }
    }

    // Lowest priority wins; a tie keeps the candidate collected first.
    let mut winner: Option<&CandidateBid> = None;
    for candidate in &candidates {
        if blocked.iter().any(|l| l.matches(&candidate.event)) {
            continue;
        }
        match winner {
            Some(best) if best.priority <= candidate.priority => {}
            _ => winner = Some(candidate),
        }
    }

    winner.cloned().map(|w| (w, candidates, decls))
}

/// Notification phase: terminate interrupted threads, wake satisfied ones.
fn notify(core: &Rc<RefCell<Core>>, winner: &CandidateBid) {
    // Matches are computed from a fresh copy of the declarations so user
    // predicates run unborrowed.
    let decls = core.borrow().decls();
    let mut interrupted: HashSet<ThreadId> = HashSet::new();
    let mut woken: HashSet<ThreadId> = HashSet::new();
    for decl in &decls {
        let is_interrupted = decl.idiom.interrupt.iter().any(|l| l.matches(&winner.event));
        let is_waited_for = decl.idiom.wait_for.iter().any(|l| l.matches(&winner.event));
        let has_own_request = decl
            .idiom
            .request
            .as_ref()
            .is_some_and(|request| request_matches(request, winner));
        if is_interrupted {
            interrupted.insert(decl.id.clone());
        }
        if is_interrupted || is_waited_for || has_own_request {
            woken.insert(decl.id.clone());
        }
    }

    let mut terminated: Vec<Rules> = Vec::new();
    {
        let mut c = core.borrow_mut();
        let mut still_pending = Vec::with_capacity(c.pending.len());
        for mut bid in std::mem::take(&mut c.pending) {
            if !woken.contains(&bid.id) {
                still_pending.push(bid);
                continue;
            }
            if interrupted.contains(&bid.id) {
                trace!(thread = %bid.id, event = %winner.event, "thread interrupted");
                terminated.extend(bid.rules.take());
            }
            // Interrupted records still pass through running once so status
            // flips on the next resume exactly like normal completion.
            c.running.push(RunningBid {
                id: bid.id,
                priority: bid.priority,
                is_trigger: bid.is_trigger,
                rules: bid.rules,
            });
        }
        c.pending = still_pending;
    }
    // Finalizers (Drop impls) of terminated computations run with no borrow
    // held; they may safely use a Trigger.
    drop(terminated);
}

/// Does the winner satisfy this thread's own request?
///
/// Template requests match by template identity; concrete requests match by
/// event type.
fn request_matches(request: &Request, winner: &CandidateBid) -> bool {
    match request {
        Request::Template(template) => winner
            .template
            .as_ref()
            .is_some_and(|selected| template.same_as(selected)),
        Request::Event(event) => event.event_type == winner.event.event_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventTemplate;
    use crate::threads::{b_sync, b_thread, Repeat};
    use serde_json::json;
    use std::cell::Cell;

    type Log = Rc<RefCell<Vec<String>>>;

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn record(log: &Log, event_type: &'static str) -> impl Fn(&Value) + 'static {
        let log = Rc::clone(log);
        move |detail| {
            let suffix = match detail {
                Value::Null => String::new(),
                other => format!(":{other}"),
            };
            log.borrow_mut().push(format!("{event_type}{suffix}"));
        }
    }

    fn square(n: u64) -> Value {
        json!({ "square": n })
    }

    fn enforce_turns() -> Rules {
        b_thread(
            vec![
                b_sync(Idiom::new().wait_for("X").block("O")),
                b_sync(Idiom::new().wait_for("O").block("X")),
            ],
            Repeat::Forever,
        )
    }

    #[test]
    fn triggered_events_reach_feedback_handlers() {
        let program = BProgram::new();
        let log = new_log();
        let _sub = program.use_feedback(
            Handlers::new()
                .on("X", record(&log, "X"))
                .on("O", record(&log, "O")),
        );

        program.trigger(Event::new("X").with_detail(square(1)));
        program.trigger(Event::new("O").with_detail(square(0)));

        assert_eq!(
            *log.borrow(),
            vec![r#"X:{"square":1}"#, r#"O:{"square":0}"#]
        );
    }

    #[test]
    fn turn_taking_blocks_out_of_turn_moves() {
        let program = BProgram::new();
        program.register(vec![("enforce-turns", enforce_turns())]);
        let log = new_log();
        let _sub = program.use_feedback(
            Handlers::new()
                .on("X", record(&log, "X"))
                .on("O", record(&log, "O")),
        );

        program.trigger(Event::new("X").with_detail(square(0)));
        // Second X before O: vetoed, nothing selected.
        program.trigger(Event::new("X").with_detail(square(2)));
        program.trigger(Event::new("O").with_detail(square(1)));
        program.trigger(Event::new("X").with_detail(square(4)));

        assert_eq!(
            *log.borrow(),
            vec![
                r#"X:{"square":0}"#,
                r#"O:{"square":1}"#,
                r#"X:{"square":4}"#
            ]
        );
    }

    #[test]
    fn taken_squares_cannot_be_retaken() {
        let program = BProgram::new();
        program.register(vec![("enforce-turns", enforce_turns())]);
        for n in 0..9u64 {
            program.register(vec![(
                format!("square-{n}-taken"),
                b_thread(
                    vec![
                        b_sync(Idiom::new().wait_for(Listener::matching(move |ev| {
                            ev.detail.as_ref().is_some_and(|d| d["square"] == n)
                        }))),
                        b_sync(Idiom::new().block(Listener::matching(move |ev| {
                            ev.detail.as_ref().is_some_and(|d| d["square"] == n)
                        }))),
                    ],
                    Repeat::No,
                ),
            )]);
        }
        let log = new_log();
        let _sub = program.use_feedback(
            Handlers::new()
                .on("X", record(&log, "X"))
                .on("O", record(&log, "O")),
        );

        program.trigger(Event::new("X").with_detail(square(1)));
        program.trigger(Event::new("O").with_detail(square(0)));
        // X tries square 1 again: the square-taken thread now blocks it.
        program.trigger(Event::new("X").with_detail(square(1)));
        // Still X's turn (the retake never selected), O stays vetoed.
        program.trigger(Event::new("O").with_detail(square(2)));
        program.trigger(Event::new("X").with_detail(square(2)));

        assert_eq!(
            *log.borrow(),
            vec![
                r#"X:{"square":1}"#,
                r#"O:{"square":0}"#,
                r#"X:{"square":2}"#
            ]
        );
    }

    #[test]
    fn win_fires_only_after_third_matching_move() {
        let program = BProgram::new();
        let corners: [u64; 3] = [0, 4, 8];
        let wait_corner = move || {
            Idiom::new().wait_for(Listener::matching(move |ev| {
                ev.event_type == "X"
                    && ev
                        .detail
                        .as_ref()
                        .is_some_and(|d| d["square"].as_u64().is_some_and(|s| corners.contains(&s)))
            }))
        };
        program.register(vec![(
            "x-wins-diagonal",
            b_thread(
                vec![
                    b_sync(wait_corner()),
                    b_sync(wait_corner()),
                    b_sync(wait_corner()),
                    b_sync(
                        Idiom::new()
                            .request(Event::new("win").with_detail(json!({ "squares": [0, 4, 8] }))),
                    ),
                ],
                Repeat::No,
            ),
        )]);
        let log = new_log();
        let _sub = program.use_feedback(Handlers::new().on("win", record(&log, "win")));

        program.trigger(Event::new("X").with_detail(square(0)));
        program.trigger(Event::new("X").with_detail(square(4)));
        assert!(log.borrow().is_empty(), "win must wait for the third move");
        program.trigger(Event::new("X").with_detail(square(8)));

        assert_eq!(*log.borrow(), vec![r#"win:{"squares":[0,4,8]}"#]);
        assert!(program.status("x-wins-diagonal").is_done());
    }

    #[test]
    fn priority_orders_simultaneous_requests() {
        let program = BProgram::new();
        let requester = |event_type: &str| {
            b_thread(
                vec![b_sync(Idiom::new().request(Event::new(event_type)))],
                Repeat::No,
            )
        };
        program.register(vec![
            ("first", requester("a")),
            ("second", requester("b")),
            ("third", requester("c")),
        ]);
        let log = new_log();
        let _sub = program.use_feedback(
            Handlers::new()
                .on("go", record(&log, "go"))
                .on("a", record(&log, "a"))
                .on("b", record(&log, "b"))
                .on("c", record(&log, "c")),
        );

        program.trigger(Event::new("go"));

        assert_eq!(*log.borrow(), vec!["go", "a", "b", "c"]);
    }

    #[test]
    fn equal_priorities_fall_back_to_declaration_order() {
        let program = BProgram::new();
        let waiter = |requested: &str| {
            b_thread(
                vec![
                    b_sync(Idiom::new().wait_for("go")),
                    b_sync(Idiom::new().request(Event::new(requested))),
                ],
                Repeat::No,
            )
        };
        // "opener" takes priority 1 and completes on the first trigger;
        // "earlier" registers behind it at priority 2. "later" registers
        // after opener is gone and gets priority 2 as well.
        program.register(vec![(
            "opener",
            b_thread(vec![b_sync(Idiom::new().request(Event::new("open")))], Repeat::No),
        )]);
        program.register(vec![("earlier", waiter("from-earlier"))]);
        program.trigger(Event::new("kick"));
        assert!(program.status("opener").is_done());
        program.register(vec![("later", waiter("from-later"))]);

        let log = new_log();
        let _sub = program.use_feedback(
            Handlers::new()
                .on("from-earlier", record(&log, "from-earlier"))
                .on("from-later", record(&log, "from-later")),
        );
        program.trigger(Event::new("go"));

        assert_eq!(*log.borrow(), vec!["from-earlier", "from-later"]);
    }

    #[test]
    fn blocked_candidates_lose_to_lower_priority_ones() {
        let program = BProgram::new();
        program.register(vec![
            (
                "hot-first",
                b_thread(vec![b_sync(Idiom::new().request(Event::new("hot")))], Repeat::No),
            ),
            (
                "veto-hot",
                b_thread(vec![b_sync(Idiom::new().block("hot").wait_for("cold"))], Repeat::No),
            ),
            (
                "cold-second",
                b_thread(vec![b_sync(Idiom::new().request(Event::new("cold")))], Repeat::No),
            ),
        ]);
        let log = new_log();
        let _sub = program.use_feedback(
            Handlers::new()
                .on("hot", record(&log, "hot"))
                .on("cold", record(&log, "cold")),
        );

        program.trigger(Event::new("start"));

        // "hot" outranks "cold" but is vetoed; once the veto thread retires
        // (its waitFor matched "cold"), the parked "hot" request goes through.
        assert_eq!(*log.borrow(), vec!["cold", "hot"]);
    }

    #[test]
    fn interrupt_terminates_and_runs_finalizer() {
        struct Probe {
            yielded: bool,
            dropped: Rc<Cell<bool>>,
        }
        impl Iterator for Probe {
            type Item = Idiom;
            fn next(&mut self) -> Option<Idiom> {
                if self.yielded {
                    return None;
                }
                self.yielded = true;
                Some(Idiom::new().wait_for("never").interrupt("stop"))
            }
        }
        impl Drop for Probe {
            fn drop(&mut self) {
                self.dropped.set(true);
            }
        }

        let program = BProgram::new();
        let dropped = Rc::new(Cell::new(false));
        program.register(vec![(
            "worker",
            Box::new(Probe {
                yielded: false,
                dropped: Rc::clone(&dropped),
            }) as Rules,
        )]);

        program.trigger(Event::new("warmup"));
        let status = program.status("worker");
        assert!(status.pending && !status.running);
        assert!(!dropped.get());

        program.trigger(Event::new("stop"));
        assert!(dropped.get(), "interrupt must drop the computation");
        assert!(program.status("worker").is_done());

        // Interrupted means gone: the event it waited for does nothing now.
        program.trigger(Event::new("never"));
        assert!(program.status("worker").is_done());
    }

    #[test]
    fn injected_event_is_candidate_immediately_but_blockable() {
        let program = BProgram::new();
        program.register(vec![
            (
                "veto-ext",
                b_thread(vec![b_sync(Idiom::new().block("ext"))], Repeat::Forever),
            ),
            (
                "fallback",
                b_thread(
                    vec![b_sync(Idiom::new().request(Event::new("fallback")))],
                    Repeat::No,
                ),
            ),
        ]);
        let snapshots: Rc<RefCell<Vec<SnapshotMessage>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&snapshots);
        let _snap = program.use_snapshot(move |msg| sink.borrow_mut().push(msg.clone()));
        let log = new_log();
        let _sub = program.use_feedback(
            Handlers::new()
                .on("ext", record(&log, "ext"))
                .on("fallback", record(&log, "fallback")),
        );

        program.trigger(Event::new("ext"));

        assert_eq!(*log.borrow(), vec!["fallback"]);
        let report = &snapshots.borrow()[0];
        let ext = report.iter().find(|e| e.event_type == "ext").expect("ext row");
        assert!(ext.trigger);
        assert!(!ext.selected);
        assert_eq!(ext.priority, 0);
        assert_eq!(ext.blocked_by.as_deref(), Some("veto-ext"));
        let fallback = report.iter().find(|e| e.event_type == "fallback").expect("fallback row");
        assert!(fallback.selected);
        assert_eq!(fallback.blocked_by, None);
    }

    #[test]
    fn snapshot_is_published_before_feedback_each_step() {
        let program = BProgram::new();
        program.register(vec![(
            "responder",
            b_thread(
                vec![
                    b_sync(Idiom::new().wait_for("X")),
                    b_sync(Idiom::new().request(Event::new("ack"))),
                ],
                Repeat::No,
            ),
        )]);
        let log = new_log();
        let snap = Rc::clone(&log);
        let _snap = program.use_snapshot(move |report| {
            for entry in report.iter().filter(|e| e.selected) {
                snap.borrow_mut().push(format!("snap:{}", entry.event_type));
            }
        });
        let _sub = program.use_feedback(
            Handlers::new()
                .on("X", record(&log, "fb:X"))
                .on("ack", record(&log, "fb:ack")),
        );

        program.trigger(Event::new("X"));

        // Within each step the report precedes delivery; steps never overlap.
        assert_eq!(*log.borrow(), vec!["snap:X", "fb:X", "snap:ack", "fb:ack"]);
    }

    #[test]
    fn registration_alone_does_not_advance_the_program() {
        let program = BProgram::new();
        let log = new_log();
        let _sub = program.use_feedback(Handlers::new().on("eager", record(&log, "eager")));

        program.register(vec![(
            "eager",
            b_thread(vec![b_sync(Idiom::new().request(Event::new("eager")))], Repeat::No),
        )]);
        assert!(log.borrow().is_empty());
        assert!(program.status("eager").running);

        program.trigger(Event::new("nudge"));
        assert_eq!(*log.borrow(), vec!["eager"]);
        assert!(program.status("eager").is_done());
    }

    #[test]
    fn feedback_handlers_may_trigger_reentrantly() {
        let program = BProgram::new();
        let log = new_log();
        let handle = program.handle();
        let ping_log = Rc::clone(&log);
        let _sub = program.use_feedback(
            Handlers::new()
                .on("ping", move |_| {
                    ping_log.borrow_mut().push("ping".into());
                    handle.trigger(Event::new("pong"));
                })
                .on("pong", record(&log, "pong")),
        );

        program.trigger(Event::new("ping"));

        assert_eq!(*log.borrow(), vec!["ping", "pong"]);
    }

    #[test]
    fn reregistering_a_name_replaces_the_thread() {
        let program = BProgram::new();
        let log = new_log();
        let _sub = program.use_feedback(
            Handlers::new()
                .on("done", record(&log, "done"))
                .on("done-replacement", record(&log, "done-replacement")),
        );
        let listener = |waits: &str, then: &str| {
            let then = then.to_string();
            b_thread(
                vec![
                    b_sync(Idiom::new().wait_for(waits)),
                    b_sync(Idiom::new().request(Event::new(then.clone()))),
                ],
                Repeat::No,
            )
        };

        program.register(vec![("listener", listener("event-a", "done"))]);
        program.register(vec![("listener", listener("event-b", "done-replacement"))]);

        // The original thread is gone: its wake-up event does nothing.
        program.trigger(Event::new("event-a"));
        assert!(log.borrow().is_empty());
        let status = program.status("listener");
        assert!(status.pending && !status.running);

        program.trigger(Event::new("event-b"));
        assert_eq!(*log.borrow(), vec!["done-replacement"]);
    }

    #[test]
    fn snapshot_channel_is_lazy_and_torn_down_with_last_listener() {
        let program = BProgram::new();
        let first_seen = Rc::new(Cell::new(0u32));
        let second_seen = Rc::new(Cell::new(0u32));

        let a = Rc::clone(&first_seen);
        let first = program.use_snapshot(move |_| a.set(a.get() + 1));
        let b = Rc::clone(&second_seen);
        let second = program.use_snapshot(move |_| b.set(b.get() + 1));

        program.trigger(Event::new("one"));
        assert_eq!((first_seen.get(), second_seen.get()), (1, 1));

        // Dropping one listener must not tear the channel down.
        first.disconnect();
        program.trigger(Event::new("two"));
        assert_eq!((first_seen.get(), second_seen.get()), (1, 2));

        second.disconnect();
        program.trigger(Event::new("three"));
        assert_eq!((first_seen.get(), second_seen.get()), (1, 2));

        // Resubscription recreates the channel.
        let c = Rc::clone(&first_seen);
        let _again = program.use_snapshot(move |_| c.set(c.get() + 1));
        program.trigger(Event::new("four"));
        assert_eq!(first_seen.get(), 2);
    }

    #[test]
    fn feedback_unsubscribe_stops_delivery() {
        let program = BProgram::new();
        let log = new_log();
        let sub = program.use_feedback(Handlers::new().on("tick", record(&log, "tick")));

        program.trigger(Event::new("tick"));
        sub.disconnect();
        program.trigger(Event::new("tick"));

        assert_eq!(*log.borrow(), vec!["tick"]);
    }

    #[test]
    fn public_trigger_rejects_unlisted_events() {
        let program = BProgram::new();
        let log = new_log();
        let _sub = program.use_feedback(
            Handlers::new()
                .on("allowed", record(&log, "allowed"))
                .on("secret", record(&log, "secret")),
        );
        let public = program.public_handle(["allowed"]);

        assert!(public.trigger(Event::new("allowed")).is_ok());
        let err = public.trigger(Event::new("secret")).unwrap_err();
        assert_eq!(err.as_label(), "trigger_not_public");

        assert_eq!(*log.borrow(), vec!["allowed"]);
    }

    #[test]
    fn templates_resolve_once_per_selection_and_match_by_identity() {
        let program = BProgram::new();
        let evaluations = Rc::new(Cell::new(0u32));
        let counter = Rc::clone(&evaluations);
        let template = EventTemplate::new(move || {
            counter.set(counter.get() + 1);
            Event::new("tick").with_detail(json!(counter.get()))
        });
        program.register(vec![(
            "ticker",
            b_thread(vec![b_sync(Idiom::new().request(template))], Repeat::No),
        )]);
        let log = new_log();
        let _sub = program.use_feedback(Handlers::new().on("tick", record(&log, "tick")));

        program.trigger(Event::new("go"));

        // One evaluation for the step that selected "go", one for the step
        // that selected "tick".
        assert_eq!(evaluations.get(), 2);
        assert_eq!(*log.borrow(), vec!["tick:2"]);
        assert!(program.status("ticker").is_done());
    }

    #[test]
    fn wait_for_matches_any_of_several_listeners() {
        let program = BProgram::new();
        let either = || {
            b_thread(
                vec![
                    b_sync(Idiom::new().wait_for("X").wait_for("O")),
                    b_sync(Idiom::new().request(Event::new("seen"))),
                ],
                Repeat::No,
            )
        };
        let log = new_log();
        let _sub = program.use_feedback(Handlers::new().on("seen", record(&log, "seen")));

        program.register(vec![("either-1", either())]);
        program.trigger(Event::new("O"));
        program.register(vec![("either-2", either())]);
        program.trigger(Event::new("X"));

        assert_eq!(*log.borrow(), vec!["seen", "seen"]);
    }

    #[test]
    fn missing_detail_is_delivered_as_null() {
        let program = BProgram::new();
        let seen = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&seen);
        let _sub = program.use_feedback(
            Handlers::new().on("bare", move |detail| {
                *sink.borrow_mut() = Some(detail.clone());
            }),
        );

        program.trigger(Event::new("bare"));

        assert_eq!(*seen.borrow(), Some(Value::Null));
    }

    #[test]
    fn trigger_handle_outliving_the_program_is_a_noop() {
        let program = BProgram::new();
        let handle = program.handle();
        drop(program);
        handle.trigger(Event::new("ghost")); // must not panic
    }

    #[test]
    fn status_of_unknown_thread_is_done() {
        let program = BProgram::new();
        assert!(program.status("nobody").is_done());
    }
}
