//! # Engine core: registries, super-step loop, selection and reporting.
//!
//! Submodules:
//! - `program` — [`BProgram`], the trigger handles and the super-step loop
//! - `bids` — running/pending/candidate records and [`ThreadStatus`]
//! - `snapshot` — per-step [`SnapshotMessage`] reports

mod bids;
mod program;
mod snapshot;

pub use bids::ThreadStatus;
pub use program::{BProgram, Handlers, PublicTrigger, Trigger};
pub use snapshot::{SnapshotEntry, SnapshotMessage};
