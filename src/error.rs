//! Error types used by the behavioral program engine.
//!
//! The engine itself never fails: selection over an empty or fully blocked
//! candidate set is simply quiescence, and faulty thread bodies panic rather
//! than return. The only fallible surface is the restricted trigger gateway,
//! covered by [`TriggerError`].

use thiserror::Error;

/// # Errors produced by the restricted trigger gateway.
///
/// Returned by [`PublicTrigger::trigger`](crate::PublicTrigger::trigger) when
/// an event fails the allow-list check. Rejected events never enter the
/// program.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TriggerError {
    /// Event type is not on the gateway's allow list.
    #[error("event type {event_type:?} is not public")]
    NotPublic {
        /// Type of the rejected event.
        event_type: String,
    },
}

impl TriggerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use behavisor::TriggerError;
    ///
    /// let err = TriggerError::NotPublic { event_type: "secret".into() };
    /// assert_eq!(err.as_label(), "trigger_not_public");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TriggerError::NotPublic { .. } => "trigger_not_public",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TriggerError::NotPublic { event_type } => {
                format!("event type {event_type:?} rejected: not on the public allow list")
            }
        }
    }
}
