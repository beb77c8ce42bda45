//! # B-thread authoring surface.
//!
//! This module provides the types a thread author touches:
//! - [`Idiom`] — the synchronization statement yielded at each suspension
//!   point
//! - [`Rules`] / [`RuleFn`] — thread bodies as iterators and the factories
//!   that produce them
//! - [`b_sync`] / [`b_thread`] / [`Repeat`] — helpers for the common
//!   list-of-rules shape
//!
//! Threads never see the engine or each other; their whole interface is the
//! sequence of statements they yield.

mod idiom;
mod rules;

pub use idiom::Idiom;
pub use rules::{b_sync, b_thread, Repeat, RuleFn, Rules};
