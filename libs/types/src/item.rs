//! Queue item lifecycle types
//!
//! A queue item is a pending withdrawal or deposit request awaiting pairing.
//! Items are never physically deleted; terminal statuses retain the row for
//! audit.

use crate::errors::EngineError;
use crate::ids::{CustomerId, ItemId, MatchId};
use crate::money::Amount;
use crate::payment::PaymentMethod;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the queue an item sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemKind {
    /// A customer wants money out
    Withdrawal,
    /// A customer wants money in
    Deposit,
}

impl ItemKind {
    /// Get the opposite kind (the side a match candidate comes from)
    pub fn opposite(&self) -> Self {
        match self {
            ItemKind::Withdrawal => ItemKind::Deposit,
            ItemKind::Deposit => ItemKind::Withdrawal,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Withdrawal => write!(f, "WITHDRAWAL"),
            ItemKind::Deposit => write!(f, "DEPOSIT"),
        }
    }
}

/// Queue item status
///
/// `Pending -> Matched -> Processing -> Completed` is the happy path.
/// `Pending -> Cancelled` on explicit cancellation; `Matched`/`Processing`
/// items move to `Failed` when their match fails. A `Failed` item returns
/// to `Pending` only through an explicit re-queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    Pending,
    Matched,
    Processing,
    Completed,
    Cancelled,
    Failed,
}

impl ItemStatus {
    /// Check if status is terminal (no automatic transitions out)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ItemStatus::Completed | ItemStatus::Cancelled | ItemStatus::Failed
        )
    }

    /// Check whether a transition to `next` is permitted
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::Matched)
                | (ItemStatus::Pending, ItemStatus::Cancelled)
                | (ItemStatus::Matched, ItemStatus::Processing)
                | (ItemStatus::Matched, ItemStatus::Failed)
                | (ItemStatus::Processing, ItemStatus::Completed)
                | (ItemStatus::Processing, ItemStatus::Failed)
                // Explicit manager re-queue only; never automatic
                | (ItemStatus::Failed, ItemStatus::Pending)
        )
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Matched => "MATCHED",
            ItemStatus::Processing => "PROCESSING",
            ItemStatus::Completed => "COMPLETED",
            ItemStatus::Cancelled => "CANCELLED",
            ItemStatus::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// A withdrawal or deposit request in the queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub kind: ItemKind,
    pub customer_id: CustomerId,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
    pub payment_details: String,
    /// Caller-supplied urgency, higher = more urgent (default 1)
    pub priority: u8,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set exactly when status leaves Pending for the match path
    pub matched_with: Option<MatchId>,
    pub notes: Option<String>,
}

impl QueueItem {
    /// Create a new pending item
    pub fn new(
        kind: ItemKind,
        customer_id: CustomerId,
        amount: Amount,
        payment_method: PaymentMethod,
        payment_details: String,
        priority: u8,
        notes: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ItemId::new(),
            kind,
            customer_id,
            amount,
            payment_method,
            payment_details,
            priority,
            status: ItemStatus::Pending,
            created_at: timestamp,
            updated_at: timestamp,
            matched_with: None,
            notes,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ItemStatus::Pending
    }

    /// Core invariant: Pending items have no match reference; matched-path
    /// statuses always carry one. Cancelled items never matched at all.
    pub fn check_invariant(&self) -> bool {
        match self.status {
            ItemStatus::Pending | ItemStatus::Cancelled => self.matched_with.is_none(),
            ItemStatus::Matched | ItemStatus::Processing | ItemStatus::Completed => {
                self.matched_with.is_some()
            }
            // Failed items keep their match reference until re-queued
            ItemStatus::Failed => self.matched_with.is_some(),
        }
    }

    /// Whole minutes this item has been waiting since creation
    pub fn wait_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_minutes().max(0)
    }

    /// Claim this item for a match: Pending -> Matched
    pub fn mark_matched(
        &mut self,
        match_id: MatchId,
        timestamp: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        self.transition(ItemStatus::Matched, timestamp)?;
        self.matched_with = Some(match_id);
        Ok(())
    }

    /// Re-queue a Failed item: Failed -> Pending, clearing the match reference
    pub fn requeue(&mut self, timestamp: DateTime<Utc>) -> Result<(), EngineError> {
        self.transition(ItemStatus::Pending, timestamp)?;
        self.matched_with = None;
        Ok(())
    }

    /// Apply a status transition, rejecting anything the state machine
    /// does not permit
    pub fn transition(
        &mut self,
        next: ItemStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        if !self.status.can_transition_to(next) {
            return Err(EngineError::invalid_transition("item", self.status, next));
        }
        self.status = next;
        self.updated_at = timestamp;
        Ok(())
    }
}
