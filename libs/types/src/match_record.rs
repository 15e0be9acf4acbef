//! Match record lifecycle types
//!
//! A match is a committed pairing of one withdrawal and one deposit. Its
//! state machine is coupled 1:1 with both linked items, and it is mutated
//! only by the lifecycle controller once created.

use crate::errors::EngineError;
use crate::ids::{ItemId, MatchId};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Match status: `Pending -> Processing -> Completed`, or `-> Failed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    /// Created by the matcher, awaiting the manager's process call
    Pending,
    /// Handed to the external payment executor
    Processing,
    /// Funds confirmed moved (terminal)
    Completed,
    /// Processing failed (terminal; items require explicit re-queue)
    Failed,
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Failed)
    }

    /// Check whether a transition to `next` is permitted
    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (MatchStatus::Pending, MatchStatus::Processing)
                | (MatchStatus::Pending, MatchStatus::Failed)
                | (MatchStatus::Processing, MatchStatus::Completed)
                | (MatchStatus::Processing, MatchStatus::Failed)
        )
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchStatus::Pending => "PENDING",
            MatchStatus::Processing => "PROCESSING",
            MatchStatus::Completed => "COMPLETED",
            MatchStatus::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// A committed pairing of one withdrawal and one deposit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub withdrawal_id: ItemId,
    pub deposit_id: ItemId,
    /// Settled amount; equals the withdrawal amount (no partial fills)
    pub amount: Amount,
    /// Score computed at match time. Audit value, immutable after creation.
    pub match_score: i64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Match {
    /// Create a new pending match
    pub fn new(
        withdrawal_id: ItemId,
        deposit_id: ItemId,
        amount: Amount,
        match_score: i64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MatchId::new(),
            withdrawal_id,
            deposit_id,
            amount,
            match_score,
            status: MatchStatus::Pending,
            created_at: timestamp,
            completed_at: None,
            notes: None,
        }
    }

    /// A match is active while it still reserves its two items
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// True if the match references the given item on either side
    pub fn references(&self, item_id: ItemId) -> bool {
        self.withdrawal_id == item_id || self.deposit_id == item_id
    }

    /// Apply a status transition, rejecting anything the state machine
    /// does not permit. Sets `completed_at` on completion.
    pub fn transition(
        &mut self,
        next: MatchStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if !self.status.can_transition_to(next) {
            return Err(EngineError::invalid_transition("match", self.status, next));
        }
        self.status = next;
        if next == MatchStatus::Completed {
            self.completed_at = Some(timestamp);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match() -> Match {
        Match::new(ItemId::new(), ItemId::new(), Amount::from_u64(150), 150, Utc::now())
    }

    #[test]
    fn test_new_match_is_pending() {
        let record = sample_match();
        assert_eq!(record.status, MatchStatus::Pending);
        assert!(record.is_active());
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn test_happy_path() {
        let mut record = sample_match();
        let now = Utc::now();
        record.transition(MatchStatus::Processing, now).unwrap();
        record.transition(MatchStatus::Completed, now).unwrap();
        assert!(record.completed_at.is_some());
        assert!(!record.is_active());
    }

    #[test]
    fn test_complete_requires_processing() {
        let mut record = sample_match();
        let err = record
            .transition(MatchStatus::Completed, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(record.status, MatchStatus::Pending, "state unchanged");
    }

    #[test]
    fn test_fail_from_pending_and_processing() {
        let mut from_pending = sample_match();
        from_pending.transition(MatchStatus::Failed, Utc::now()).unwrap();
        assert!(!from_pending.is_active());

        let mut from_processing = sample_match();
        let now = Utc::now();
        from_processing.transition(MatchStatus::Processing, now).unwrap();
        from_processing.transition(MatchStatus::Failed, now).unwrap();
        assert!(!from_processing.is_active());
    }

    #[test]
    fn test_terminal_rejects_everything() {
        let mut record = sample_match();
        let now = Utc::now();
        record.transition(MatchStatus::Failed, now).unwrap();
        for next in [
            MatchStatus::Pending,
            MatchStatus::Processing,
            MatchStatus::Completed,
        ] {
            assert!(record.transition(next, now).is_err());
        }
    }

    #[test]
    fn test_references() {
        let record = sample_match();
        assert!(record.references(record.withdrawal_id));
        assert!(record.references(record.deposit_id));
        assert!(!record.references(ItemId::new()));
    }
}
