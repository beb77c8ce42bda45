//! # behavisor
//!
//! **Behavisor** is a behavioral programming engine for Rust.
//!
//! It coordinates independent *b-threads* — resumable computations that never
//! call each other — through synchronized event selection: at each
//! synchronization point a thread declares what it requests, waits for,
//! blocks, and is interrupted by, and the engine picks exactly one event per
//! step. The crate is designed as a building block for reactive state
//! machines, protocol logic, and UI behavior layers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!  │   b-thread   │   │   b-thread   │   │   b-thread   │
//!  │ (rules #1)   │   │ (rules #2)   │   │ (rules #3)   │
//!  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!         │ yields Idiom     │                  │
//!         ▼                  ▼                  ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  BProgram (super-step engine)                               │
//! │  - running / pending registries (insertion-ordered)         │
//! │  - selection: veto blocked candidates, lowest priority wins │
//! │  - notification: wake waiters, terminate interrupted        │
//! └───────┬──────────────────────┬───────────────────┬──────────┘
//!         │                      │                   ▲
//!         ▼                      ▼                   │
//!   feedback channel       snapshot channel     Trigger / PublicTrigger
//!   (selected events       (per-step reports,   (external injection at
//!    → Handlers)            lazily activated)    priority 0)
//! ```
//!
//! ### Super-step
//! ```text
//! trigger(event) ──► wrap as one-shot thread (priority 0) ──► run()
//!
//! loop {
//!   ├─► resume every running thread to its next sync point
//!   ├─► collect candidates + block listeners from pending statements
//!   ├─► drop blocked candidates; select lowest priority (ties: first seen)
//!   │     └─ none selectable ─► program returns to idle
//!   ├─► publish snapshot (when subscribed)
//!   ├─► notify: interrupt-matched threads terminated (Drop = finalizer),
//!   │           waitFor / own-request matched threads back to running
//!   └─► publish selected event to feedback handlers
//! }
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types / functions                   |
//! |-----------------|---------------------------------------------------------|-----------------------------------------|
//! | **Authoring**   | Declare thread bodies as iterators of statements.       | [`Idiom`], [`b_sync`], [`b_thread`]     |
//! | **Events**      | Typed events with JSON detail; deferred templates.      | [`Event`], [`EventTemplate`]            |
//! | **Matching**    | Match events by type or arbitrary predicate.            | [`Listener`]                            |
//! | **Coordination**| Register threads, inject events, inspect status.        | [`BProgram`], [`Trigger`]               |
//! | **Observation** | React to selected events; inspect each step.            | [`Handlers`], [`BProgram::use_snapshot`]|
//! | **Gatekeeping** | Hand untrusted callers an allow-listed injector.        | [`PublicTrigger`], [`TriggerError`]     |
//! | **State**       | Bridge observable values into programs as events.       | [`Signal`]                              |
//!
//! ## Example
//! ```rust
//! use behavisor::{b_sync, b_thread, BProgram, Event, Handlers, Idiom, Repeat};
//!
//! let program = BProgram::new();
//!
//! // X and O must alternate; out-of-turn moves are vetoed.
//! program.register(vec![(
//!     "enforce-turns",
//!     b_thread(
//!         vec![
//!             b_sync(Idiom::new().wait_for("X").block("O")),
//!             b_sync(Idiom::new().wait_for("O").block("X")),
//!         ],
//!         Repeat::Forever,
//!     ),
//! )]);
//!
//! let _sub = program.use_feedback(
//!     Handlers::new()
//!         .on("X", |detail| println!("X plays {detail}"))
//!         .on("O", |detail| println!("O plays {detail}")),
//! );
//!
//! program.trigger(Event::new("X"));
//! program.trigger(Event::new("O"));
//! ```
//!
//! Programs are deliberately single-threaded: every operation, thread body,
//! and listener runs on the caller's thread, and each `trigger` call runs the
//! program to quiescence before returning.

mod core;
mod error;
mod events;
mod signal;
mod threads;

// ---- Public re-exports ----

pub use crate::core::{
    BProgram, Handlers, PublicTrigger, SnapshotEntry, SnapshotMessage, ThreadStatus, Trigger,
};
pub use crate::error::TriggerError;
pub use crate::events::{Disconnect, Event, EventTemplate, Listener, Request};
pub use crate::signal::Signal;
pub use crate::threads::{b_sync, b_thread, Idiom, Repeat, RuleFn, Rules};
