//! Event taxonomy for the queue engine
//!
//! Every committed mutation is one event. Events are the journal's payload
//! (replayed on open to rebuild state) and the signal emitted to the
//! external ledger/notification collaborators on completion and failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::ids::{ItemId, MatchId};
use types::item::QueueItem;
use types::match_record::Match;

/// A state change in the queue, in commit order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueEvent {
    /// A withdrawal or deposit entered the queue as Pending
    ItemEnqueued { item: QueueItem },

    /// The matcher committed a pairing; both items moved to Matched
    MatchCreated { record: Match },

    /// A manager moved the match to Processing; the external payment
    /// executor takes over from here
    ProcessingStarted { match_id: MatchId, at: DateTime<Utc> },

    /// External confirmation arrived; match and items are Completed
    MatchCompleted {
        match_id: MatchId,
        notes: Option<String>,
        at: DateTime<Utc>,
    },

    /// Processing failed; match and items are Failed, awaiting an
    /// explicit re-queue decision
    MatchFailed {
        match_id: MatchId,
        reason: String,
        at: DateTime<Utc>,
    },

    /// A Pending item was cancelled before matching
    ItemCancelled { item_id: ItemId, at: DateTime<Utc> },

    /// A manager returned a Failed item to Pending
    ItemRequeued { item_id: ItemId, at: DateTime<Utc> },
}

impl QueueEvent {
    /// Short name for logging and journal inspection
    pub fn kind(&self) -> &'static str {
        match self {
            QueueEvent::ItemEnqueued { .. } => "ITEM_ENQUEUED",
            QueueEvent::MatchCreated { .. } => "MATCH_CREATED",
            QueueEvent::ProcessingStarted { .. } => "PROCESSING_STARTED",
            QueueEvent::MatchCompleted { .. } => "MATCH_COMPLETED",
            QueueEvent::MatchFailed { .. } => "MATCH_FAILED",
            QueueEvent::ItemCancelled { .. } => "ITEM_CANCELLED",
            QueueEvent::ItemRequeued { .. } => "ITEM_REQUEUED",
        }
    }
}
