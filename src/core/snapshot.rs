//! # Per-step snapshot reports.
//!
//! When a snapshot listener is subscribed, the engine produces a
//! [`SnapshotMessage`] for every selection phase that picked a winner: one
//! entry per candidate (blocked candidates included), annotated with the
//! blocking and interrupting threads that would act on it, sorted by
//! priority. The report is assembled before the notification phase, so it
//! describes the state the selector actually saw.
//!
//! Entries serialize to JSON so tooling can ship them over any transport.

use serde::Serialize;
use serde_json::Value;

use crate::core::bids::CandidateBid;
use crate::core::program::PendingDecl;

/// One candidate's row in a step report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEntry {
    /// Identifier of the requesting thread (ephemeral ids render as
    /// `trigger(<type>#<seq>)`).
    pub thread: String,
    /// True when the request came through the trigger gateway.
    pub trigger: bool,
    /// True when this candidate's event type matches the step's winner.
    pub selected: bool,
    /// Requested event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Requested event detail, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    /// Requesting thread's priority (lower wins).
    pub priority: usize,
    /// First pending thread whose block listener matches this candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
    /// First pending thread whose interrupt listener matches this candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupts: Option<String>,
}

/// Report for one super-step, sorted ascending by priority.
pub type SnapshotMessage = Vec<SnapshotEntry>;

/// Builds the report for one selection phase.
///
/// `candidates` is the unfiltered candidate list in collection order;
/// `declarations` carries every pending thread's statement for
/// block/interrupt attribution.
pub(crate) fn format_snapshot(
    candidates: &[CandidateBid],
    winner: &CandidateBid,
    declarations: &[PendingDecl],
) -> SnapshotMessage {
    let mut entries: SnapshotMessage = candidates
        .iter()
        .map(|bid| {
            let blocked_by = declarations
                .iter()
                .find(|decl| decl.idiom.block.iter().any(|l| l.matches(&bid.event)))
                .map(|decl| decl.id.to_string());
            let interrupts = declarations
                .iter()
                .find(|decl| decl.idiom.interrupt.iter().any(|l| l.matches(&bid.event)))
                .map(|decl| decl.id.to_string());
            SnapshotEntry {
                thread: bid.id.to_string(),
                trigger: bid.is_trigger,
                selected: bid.event.event_type == winner.event.event_type,
                event_type: bid.event.event_type.clone(),
                detail: bid.event.detail.clone(),
                priority: bid.priority,
                blocked_by,
                interrupts,
            }
        })
        .collect();
    entries.sort_by_key(|entry| entry.priority);
    entries
}
