//! Queue store
//!
//! Owned, journal-backed storage for queue items and match records. All
//! mutations go through explicit transactional operations that validate the
//! current state, append one event to the journal, and then apply it to the
//! in-memory maps — the same `apply` path replay uses, so a rebuilt store
//! is byte-for-byte equivalent to the one that wrote the journal.
//!
//! Items and matches are never physically deleted; terminal statuses retain
//! rows for audit.

use crate::events::QueueEvent;
use crate::journal::{self, JournalWriter};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use types::errors::EngineError;
use types::ids::{ItemId, MatchId};
use types::item::{ItemKind, ItemStatus, QueueItem};
use types::match_record::{Match, MatchStatus};

/// In-memory queue state with an optional durable journal
pub struct QueueStore {
    items: HashMap<ItemId, QueueItem>,
    matches: HashMap<MatchId, Match>,
    journal: Option<JournalWriter>,
}

impl QueueStore {
    /// Volatile store with no journal (tests, ephemeral deployments)
    pub fn in_memory() -> Self {
        Self {
            items: HashMap::new(),
            matches: HashMap::new(),
            journal: None,
        }
    }

    /// Open a durable store, replaying any existing journal
    pub fn open(dir: &Path) -> Result<Self, EngineError> {
        let events = journal::replay(dir).map_err(storage_err)?;
        let mut store = Self::in_memory();
        let replayed = events.len() as u64;
        for event in events {
            store.apply(&event)?;
        }

        let mut writer = JournalWriter::open(dir).map_err(storage_err)?;
        writer.set_next_sequence(replayed);
        store.journal = Some(writer);

        tracing::info!(
            events = replayed,
            items = store.items.len(),
            matches = store.matches.len(),
            "queue store opened"
        );
        Ok(store)
    }

    /// True when mutations are journaled to disk
    pub fn is_durable(&self) -> bool {
        self.journal.is_some()
    }

    // ── Transactional operations ────────────────────────────────────

    /// Insert a new Pending item
    pub fn insert_item(
        &mut self,
        item: QueueItem,
        now: DateTime<Utc>,
    ) -> Result<QueueEvent, EngineError> {
        self.commit(QueueEvent::ItemEnqueued { item }, now)
    }

    /// Claim both items and commit the match in one atomic step.
    ///
    /// The Pending check on each side is the claim: if either item has been
    /// taken by a concurrent attempt, the caller gets `ConcurrencyConflict`
    /// and re-runs selection against the now-current pending set.
    pub fn claim_and_match(
        &mut self,
        withdrawal_id: ItemId,
        deposit_id: ItemId,
        score: i64,
        now: DateTime<Utc>,
    ) -> Result<(Match, QueueEvent), EngineError> {
        let withdrawal = self
            .items
            .get(&withdrawal_id)
            .ok_or_else(|| EngineError::not_found("item", withdrawal_id))?;
        let deposit = self
            .items
            .get(&deposit_id)
            .ok_or_else(|| EngineError::not_found("item", deposit_id))?;

        if !withdrawal.is_pending() || !deposit.is_pending() {
            return Err(EngineError::ConcurrencyConflict);
        }

        // Settled amount is the withdrawal amount; the deposit is fully
        // reserved once matched (no partial fills).
        let record = Match::new(withdrawal_id, deposit_id, withdrawal.amount, score, now);
        let event = self.commit(
            QueueEvent::MatchCreated {
                record: record.clone(),
            },
            now,
        )?;
        Ok((record, event))
    }

    /// Pending -> Processing for one match
    pub fn start_processing(
        &mut self,
        match_id: MatchId,
        now: DateTime<Utc>,
    ) -> Result<(Match, QueueEvent), EngineError> {
        let record = self.require_match(match_id)?;
        if !record.status.can_transition_to(MatchStatus::Processing) {
            return Err(EngineError::invalid_transition(
                "match",
                record.status,
                MatchStatus::Processing,
            ));
        }
        let event = self.commit(QueueEvent::ProcessingStarted { match_id, at: now }, now)?;
        Ok((self.require_match(match_id)?.clone(), event))
    }

    /// Processing -> Completed for one match and both linked items
    pub fn complete_match(
        &mut self,
        match_id: MatchId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(Match, QueueEvent), EngineError> {
        let record = self.require_match(match_id)?;
        if record.status != MatchStatus::Processing {
            return Err(EngineError::invalid_transition(
                "match",
                record.status,
                MatchStatus::Completed,
            ));
        }
        let event = self.commit(
            QueueEvent::MatchCompleted {
                match_id,
                notes,
                at: now,
            },
            now,
        )?;
        Ok((self.require_match(match_id)?.clone(), event))
    }

    /// Pending/Processing -> Failed for one match and both linked items
    pub fn fail_match(
        &mut self,
        match_id: MatchId,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<(Match, QueueEvent), EngineError> {
        let record = self.require_match(match_id)?;
        if !record.status.can_transition_to(MatchStatus::Failed) {
            return Err(EngineError::invalid_transition(
                "match",
                record.status,
                MatchStatus::Failed,
            ));
        }
        let event = self.commit(
            QueueEvent::MatchFailed {
                match_id,
                reason,
                at: now,
            },
            now,
        )?;
        Ok((self.require_match(match_id)?.clone(), event))
    }

    /// Cancel a Pending item. A Matched item cannot be cancelled directly;
    /// its match must be explicitly failed first.
    pub fn cancel_item(
        &mut self,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<(QueueItem, QueueEvent), EngineError> {
        let item = self.require_item(item_id)?;
        if !item.status.can_transition_to(ItemStatus::Cancelled) {
            return Err(EngineError::invalid_transition(
                "item",
                item.status,
                ItemStatus::Cancelled,
            ));
        }
        let event = self.commit(QueueEvent::ItemCancelled { item_id, at: now }, now)?;
        Ok((self.require_item(item_id)?.clone(), event))
    }

    /// Explicitly return a Failed item to Pending
    pub fn requeue_item(
        &mut self,
        item_id: ItemId,
        now: DateTime<Utc>,
    ) -> Result<(QueueItem, QueueEvent), EngineError> {
        let item = self.require_item(item_id)?;
        if !item.status.can_transition_to(ItemStatus::Pending) {
            return Err(EngineError::invalid_transition(
                "item",
                item.status,
                ItemStatus::Pending,
            ));
        }
        let event = self.commit(QueueEvent::ItemRequeued { item_id, at: now }, now)?;
        Ok((self.require_item(item_id)?.clone(), event))
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn item(&self, id: ItemId) -> Option<&QueueItem> {
        self.items.get(&id)
    }

    pub fn match_record(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(&id)
    }

    pub fn require_item(&self, id: ItemId) -> Result<&QueueItem, EngineError> {
        self.items
            .get(&id)
            .ok_or_else(|| EngineError::not_found("item", id))
    }

    pub fn require_match(&self, id: MatchId) -> Result<&Match, EngineError> {
        self.matches
            .get(&id)
            .ok_or_else(|| EngineError::not_found("match", id))
    }

    /// All Pending items of one kind
    pub fn pending_of_kind(&self, kind: ItemKind) -> Vec<&QueueItem> {
        self.items
            .values()
            .filter(|item| item.kind == kind && item.is_pending())
            .collect()
    }

    pub fn items(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.values()
    }

    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    // ── Commit & replay ─────────────────────────────────────────────

    /// Append the event to the journal, then apply it to in-memory state
    fn commit(&mut self, event: QueueEvent, now: DateTime<Utc>) -> Result<QueueEvent, EngineError> {
        if let Some(journal) = &mut self.journal {
            journal
                .append_event(now.timestamp_micros(), &event)
                .map_err(storage_err)?;
        }
        self.apply(&event)?;
        tracing::debug!(kind = event.kind(), "committed queue event");
        Ok(event)
    }

    /// Apply one event to the in-memory maps. Shared by live commits and
    /// journal replay; preconditions were validated before the event was
    /// written, so a failure here means a corrupt or hand-edited journal.
    fn apply(&mut self, event: &QueueEvent) -> Result<(), EngineError> {
        match event {
            QueueEvent::ItemEnqueued { item } => {
                self.items.insert(item.id, item.clone());
            }
            QueueEvent::MatchCreated { record } => {
                let match_id = record.id;
                let at = record.created_at;
                self.with_item(record.withdrawal_id, |item| item.mark_matched(match_id, at))?;
                self.with_item(record.deposit_id, |item| item.mark_matched(match_id, at))?;
                self.matches.insert(record.id, record.clone());
            }
            QueueEvent::ProcessingStarted { match_id, at } => {
                let (withdrawal_id, deposit_id) =
                    self.with_match(*match_id, *at, MatchStatus::Processing, None)?;
                self.with_item(withdrawal_id, |item| {
                    item.transition(ItemStatus::Processing, *at)
                })?;
                self.with_item(deposit_id, |item| {
                    item.transition(ItemStatus::Processing, *at)
                })?;
            }
            QueueEvent::MatchCompleted {
                match_id,
                notes,
                at,
            } => {
                let (withdrawal_id, deposit_id) =
                    self.with_match(*match_id, *at, MatchStatus::Completed, notes.clone())?;
                self.with_item(withdrawal_id, |item| {
                    item.transition(ItemStatus::Completed, *at)
                })?;
                self.with_item(deposit_id, |item| {
                    item.transition(ItemStatus::Completed, *at)
                })?;
            }
            QueueEvent::MatchFailed {
                match_id,
                reason,
                at,
            } => {
                let (withdrawal_id, deposit_id) =
                    self.with_match(*match_id, *at, MatchStatus::Failed, Some(reason.clone()))?;
                self.with_item(withdrawal_id, |item| {
                    item.transition(ItemStatus::Failed, *at)
                })?;
                self.with_item(deposit_id, |item| {
                    item.transition(ItemStatus::Failed, *at)
                })?;
            }
            QueueEvent::ItemCancelled { item_id, at } => {
                self.with_item(*item_id, |item| {
                    item.transition(ItemStatus::Cancelled, *at)
                })?;
            }
            QueueEvent::ItemRequeued { item_id, at } => {
                self.with_item(*item_id, |item| item.requeue(*at))?;
            }
        }
        Ok(())
    }

    fn with_item(
        &mut self,
        id: ItemId,
        f: impl FnOnce(&mut QueueItem) -> Result<(), EngineError>,
    ) -> Result<(), EngineError> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("item", id))?;
        f(item)
    }

    /// Transition a match and return its two item ids for linked updates
    fn with_match(
        &mut self,
        id: MatchId,
        at: DateTime<Utc>,
        next: MatchStatus,
        notes: Option<String>,
    ) -> Result<(ItemId, ItemId), EngineError> {
        let record = self
            .matches
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found("match", id))?;
        record.transition(next, at)?;
        if notes.is_some() {
            record.notes = notes;
        }
        Ok((record.withdrawal_id, record.deposit_id))
    }
}

fn storage_err(err: crate::journal::JournalError) -> EngineError {
    EngineError::Storage(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use types::ids::CustomerId;
    use types::money::Amount;
    use types::payment::PaymentMethod;

    fn pending(kind: ItemKind, amount: u64) -> QueueItem {
        QueueItem::new(
            kind,
            CustomerId::new(),
            Amount::from_u64(amount),
            PaymentMethod::Venmo,
            "@someone".to_string(),
            1,
            None,
            Utc::now(),
        )
    }

    fn matched_pair(store: &mut QueueStore) -> Match {
        let withdrawal = pending(ItemKind::Withdrawal, 150);
        let deposit = pending(ItemKind::Deposit, 200);
        let (w_id, d_id) = (withdrawal.id, deposit.id);
        let now = Utc::now();
        store.insert_item(withdrawal, now).unwrap();
        store.insert_item(deposit, now).unwrap();
        store.claim_and_match(w_id, d_id, 150, now).unwrap().0
    }

    #[test]
    fn test_insert_and_read() {
        let mut store = QueueStore::in_memory();
        let item = pending(ItemKind::Withdrawal, 100);
        let id = item.id;
        store.insert_item(item, Utc::now()).unwrap();
        assert!(store.item(id).unwrap().is_pending());
        assert_eq!(store.pending_of_kind(ItemKind::Withdrawal).len(), 1);
        assert_eq!(store.pending_of_kind(ItemKind::Deposit).len(), 0);
    }

    #[test]
    fn test_claim_and_match_flips_both_items() {
        let mut store = QueueStore::in_memory();
        let record = matched_pair(&mut store);

        let withdrawal = store.item(record.withdrawal_id).unwrap();
        let deposit = store.item(record.deposit_id).unwrap();
        assert_eq!(withdrawal.status, ItemStatus::Matched);
        assert_eq!(deposit.status, ItemStatus::Matched);
        assert_eq!(withdrawal.matched_with, Some(record.id));
        assert_eq!(deposit.matched_with, Some(record.id));
        assert_eq!(record.amount, Amount::from_u64(150), "settled = withdrawal amount");
    }

    #[test]
    fn test_claim_already_matched_conflicts() {
        let mut store = QueueStore::in_memory();
        let record = matched_pair(&mut store);

        let other = pending(ItemKind::Withdrawal, 100);
        let other_id = other.id;
        let now = Utc::now();
        store.insert_item(other, now).unwrap();

        let err = store
            .claim_and_match(other_id, record.deposit_id, 140, now)
            .unwrap_err();
        assert_eq!(err, EngineError::ConcurrencyConflict);
    }

    #[test]
    fn test_full_lifecycle() {
        let mut store = QueueStore::in_memory();
        let record = matched_pair(&mut store);
        let now = Utc::now();

        let (record, _) = store.start_processing(record.id, now).unwrap();
        assert_eq!(record.status, MatchStatus::Processing);
        assert_eq!(
            store.item(record.withdrawal_id).unwrap().status,
            ItemStatus::Processing
        );

        let (record, _) = store
            .complete_match(record.id, Some("confirmed".to_string()), now)
            .unwrap();
        assert_eq!(record.status, MatchStatus::Completed);
        assert!(record.completed_at.is_some());
        assert_eq!(record.notes.as_deref(), Some("confirmed"));
        assert_eq!(
            store.item(record.deposit_id).unwrap().status,
            ItemStatus::Completed
        );
    }

    #[test]
    fn test_complete_requires_processing() {
        let mut store = QueueStore::in_memory();
        let record = matched_pair(&mut store);
        let err = store
            .complete_match(record.id, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
        assert_eq!(
            store.match_record(record.id).unwrap().status,
            MatchStatus::Pending,
            "state unchanged after rejected transition"
        );
    }

    #[test]
    fn test_fail_match_fails_items_not_repends() {
        let mut store = QueueStore::in_memory();
        let record = matched_pair(&mut store);
        let (record, _) = store
            .fail_match(record.id, "executor timeout".to_string(), Utc::now())
            .unwrap();
        assert_eq!(record.status, MatchStatus::Failed);
        assert_eq!(record.notes.as_deref(), Some("executor timeout"));
        assert_eq!(
            store.item(record.withdrawal_id).unwrap().status,
            ItemStatus::Failed,
            "items go to Failed, never silently back to Pending"
        );
    }

    #[test]
    fn test_cancel_pending_only() {
        let mut store = QueueStore::in_memory();
        let item = pending(ItemKind::Deposit, 100);
        let id = item.id;
        let now = Utc::now();
        store.insert_item(item, now).unwrap();
        let (cancelled, _) = store.cancel_item(id, now).unwrap();
        assert_eq!(cancelled.status, ItemStatus::Cancelled);

        let record = matched_pair(&mut store);
        let err = store.cancel_item(record.withdrawal_id, now).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn test_requeue_failed_item() {
        let mut store = QueueStore::in_memory();
        let record = matched_pair(&mut store);
        let now = Utc::now();
        store.fail_match(record.id, "bounced".to_string(), now).unwrap();

        let (item, _) = store.requeue_item(record.withdrawal_id, now).unwrap();
        assert!(item.is_pending());
        assert!(item.matched_with.is_none());

        // A Pending item cannot be re-queued again
        let err = store.requeue_item(record.withdrawal_id, now).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn test_unknown_ids_not_found() {
        let mut store = QueueStore::in_memory();
        assert!(matches!(
            store.cancel_item(ItemId::new(), Utc::now()),
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            store.start_processing(MatchId::new(), Utc::now()),
            Err(EngineError::NotFound { .. })
        ));
    }

    #[test]
    fn test_durable_store_replays_state() {
        let tmp = TempDir::new().unwrap();
        let (match_id, w_id) = {
            let mut store = QueueStore::open(tmp.path()).unwrap();
            assert!(store.is_durable());
            let record = matched_pair(&mut store);
            store.start_processing(record.id, Utc::now()).unwrap();
            (record.id, record.withdrawal_id)
        };

        let store = QueueStore::open(tmp.path()).unwrap();
        let record = store.match_record(match_id).unwrap();
        assert_eq!(record.status, MatchStatus::Processing);
        assert_eq!(store.item(w_id).unwrap().status, ItemStatus::Processing);
        assert_eq!(store.items().count(), 2);
        assert_eq!(store.matches().count(), 1);
    }
}
