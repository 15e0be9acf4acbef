//! Queue engine
//!
//! Main coordinator: owns the store behind a single lock, runs the atomic
//! select-and-claim match attempt on insertion, and drives the match
//! lifecycle. The lock serializes every match attempt — two concurrent
//! insertions can never claim the same pending counterpart — while reads
//! take a consistent snapshot and external signalling happens strictly
//! after the lock is released.

use crate::events::QueueEvent;
use crate::matcher::{self, Opportunity};
use crate::stats::{self, QueueStats};
use crate::store::QueueStore;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use types::errors::EngineError;
use types::ids::{CustomerId, ItemId, MatchId};
use types::item::{ItemKind, ItemStatus, QueueItem};
use types::match_record::{Match, MatchStatus};
use types::money::Amount;
use types::payment::PaymentMethod;

/// Receives committed events for downstream ledger posting and customer
/// notification. Implementations must not block for long; they are called
/// outside the engine lock.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: &QueueEvent);
}

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Journal directory; `None` keeps the queue in memory only
    pub data_dir: Option<PathBuf>,
}

/// Request to enqueue a withdrawal or deposit
#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub kind: ItemKind,
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_details: String,
    pub priority: Option<u8>,
    pub notes: Option<String>,
}

/// Result of an enqueue: the item either paired instantly or waits
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnqueueOutcome {
    Pending { item: QueueItem },
    Matched { item: QueueItem, record: Match },
}

impl EnqueueOutcome {
    pub fn item(&self) -> &QueueItem {
        match self {
            EnqueueOutcome::Pending { item } => item,
            EnqueueOutcome::Matched { item, .. } => item,
        }
    }

    pub fn record(&self) -> Option<&Match> {
        match self {
            EnqueueOutcome::Pending { .. } => None,
            EnqueueOutcome::Matched { record, .. } => Some(record),
        }
    }
}

/// Initialization report for the manager's init call
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub durable: bool,
    pub items: usize,
    pub matches: usize,
}

/// The queue matching engine
pub struct QueueEngine {
    state: Mutex<QueueStore>,
    sink: Option<Arc<dyn EventSink>>,
}

impl QueueEngine {
    /// Open the engine, creating/replaying the journal when configured
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let store = match &config.data_dir {
            Some(dir) => QueueStore::open(dir)?,
            None => QueueStore::in_memory(),
        };
        Ok(Self {
            state: Mutex::new(store),
            sink: None,
        })
    }

    /// Volatile engine for tests and ephemeral deployments
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(QueueStore::in_memory()),
            sink: None,
        }
    }

    /// Attach a sink for committed events
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Idempotent storage initialization report
    pub fn initialize(&self) -> Result<InitReport, EngineError> {
        let store = self.store()?;
        Ok(InitReport {
            durable: store.is_durable(),
            items: store.items().count(),
            matches: store.matches().count(),
        })
    }

    // ── Enqueue & match ─────────────────────────────────────────────

    /// Insert a withdrawal or deposit and attempt an immediate match.
    ///
    /// Validation failures reject the request before anything is created.
    /// The match attempt is optimistic best-effort: no eligible candidate
    /// means the item simply stays Pending. A lost candidate claim is
    /// retried exactly once against the then-current pending set.
    pub fn enqueue(&self, request: NewItem) -> Result<EnqueueOutcome, EngineError> {
        let amount = Amount::new(request.amount)?;
        request
            .payment_method
            .validate_details(&request.payment_details)?;
        let priority = request.priority.unwrap_or(1);
        if priority == 0 {
            return Err(EngineError::validation("priority", "must be at least 1"));
        }

        let now = Utc::now();
        let item = QueueItem::new(
            request.kind,
            request.customer_id,
            amount,
            request.payment_method,
            request.payment_details,
            priority,
            request.notes,
            now,
        );
        let item_id = item.id;

        let mut published = Vec::new();
        let outcome = {
            let mut store = self.store()?;
            published.push(store.insert_item(item, now)?);

            let mut matched = None;
            // Single bounded retry after a lost claim; never an unbounded loop
            for attempt in 0..2 {
                let trigger = store.require_item(item_id)?.clone();
                let candidate = {
                    let pending = store.pending_of_kind(trigger.kind.opposite());
                    matcher::best_candidate(&trigger, pending, now)
                };
                let Some(candidate) = candidate else {
                    break;
                };
                let (withdrawal_id, deposit_id) = match trigger.kind {
                    ItemKind::Withdrawal => (item_id, candidate.item_id),
                    ItemKind::Deposit => (candidate.item_id, item_id),
                };
                match store.claim_and_match(withdrawal_id, deposit_id, candidate.score, now) {
                    Ok((record, event)) => {
                        tracing::info!(
                            item = %item_id,
                            counterpart = %candidate.item_id,
                            score = candidate.score,
                            "matched on insertion"
                        );
                        published.push(event);
                        matched = Some(record);
                        break;
                    }
                    Err(EngineError::ConcurrencyConflict) => {
                        tracing::debug!(item = %item_id, attempt, "lost candidate claim, reselecting");
                        continue;
                    }
                    Err(other) => return Err(other),
                }
            }

            let item = store.require_item(item_id)?.clone();
            match matched {
                Some(record) => EnqueueOutcome::Matched { item, record },
                None => EnqueueOutcome::Pending { item },
            }
        };

        self.publish(&published);
        Ok(outcome)
    }

    // ── Lifecycle controller ────────────────────────────────────────

    /// Move Pending matches to Processing and signal the external executor.
    ///
    /// An empty id list means "all Pending matches". Ids already Processing
    /// are skipped (idempotent no-op); terminal ids are rejected with
    /// `InvalidTransition` before any state changes.
    pub fn process_matches(&self, ids: &[MatchId]) -> Result<Vec<Match>, EngineError> {
        let now = Utc::now();
        let mut published = Vec::new();
        let moved = {
            let mut store = self.store()?;

            let to_process: Vec<MatchId> = if ids.is_empty() {
                let mut pending: Vec<&Match> = store
                    .matches()
                    .filter(|record| record.status == MatchStatus::Pending)
                    .collect();
                pending.sort_by_key(|record| (record.created_at, record.id));
                pending.into_iter().map(|record| record.id).collect()
            } else {
                // Validate everything first so a bad id leaves state unchanged
                let mut selected = Vec::new();
                for &id in ids {
                    let record = store.require_match(id)?;
                    match record.status {
                        // A repeated id is the same no-op as an already-
                        // Processing one
                        MatchStatus::Pending if !selected.contains(&id) => selected.push(id),
                        MatchStatus::Pending | MatchStatus::Processing => {}
                        status => {
                            return Err(EngineError::invalid_transition(
                                "match",
                                status,
                                MatchStatus::Processing,
                            ))
                        }
                    }
                }
                selected
            };

            let mut moved = Vec::with_capacity(to_process.len());
            for id in to_process {
                let (record, event) = store.start_processing(id, now)?;
                published.push(event);
                moved.push(record);
            }
            moved
        };

        tracing::info!(count = moved.len(), "matches moved to processing");
        self.publish(&published);
        Ok(moved)
    }

    /// Complete a Processing match on external confirmation
    pub fn complete_match(
        &self,
        id: MatchId,
        notes: Option<String>,
    ) -> Result<Match, EngineError> {
        let now = Utc::now();
        let (record, event) = {
            let mut store = self.store()?;
            store.complete_match(id, notes, now)?
        };
        tracing::info!(match_id = %id, "match completed");
        self.publish(std::slice::from_ref(&event));
        Ok(record)
    }

    /// Fail a Pending or Processing match. Linked items move to Failed and
    /// wait for an explicit re-queue decision.
    pub fn fail_match(&self, id: MatchId, reason: String) -> Result<Match, EngineError> {
        let now = Utc::now();
        let (record, event) = {
            let mut store = self.store()?;
            store.fail_match(id, reason, now)?
        };
        tracing::warn!(match_id = %id, "match failed");
        self.publish(std::slice::from_ref(&event));
        Ok(record)
    }

    /// Cancel a Pending item. Matched items require failing the match first.
    pub fn cancel_item(&self, id: ItemId) -> Result<QueueItem, EngineError> {
        let now = Utc::now();
        let (item, event) = {
            let mut store = self.store()?;
            store.cancel_item(id, now)?
        };
        self.publish(std::slice::from_ref(&event));
        Ok(item)
    }

    /// Explicitly return a Failed item to Pending for reconsideration
    pub fn requeue_item(&self, id: ItemId) -> Result<QueueItem, EngineError> {
        let now = Utc::now();
        let (item, event) = {
            let mut store = self.store()?;
            store.requeue_item(id, now)?
        };
        self.publish(std::slice::from_ref(&event));
        Ok(item)
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub fn get_item(&self, id: ItemId) -> Result<QueueItem, EngineError> {
        Ok(self.store()?.require_item(id)?.clone())
    }

    pub fn get_match(&self, id: MatchId) -> Result<Match, EngineError> {
        Ok(self.store()?.require_match(id)?.clone())
    }

    /// List items with optional status/kind filters, oldest first
    pub fn list_items(
        &self,
        status: Option<ItemStatus>,
        kind: Option<ItemKind>,
    ) -> Result<Vec<QueueItem>, EngineError> {
        let store = self.store()?;
        let mut items: Vec<QueueItem> = store
            .items()
            .filter(|item| status.map_or(true, |s| item.status == s))
            .filter(|item| kind.map_or(true, |k| item.kind == k))
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.created_at, item.id));
        Ok(items)
    }

    /// List matches with an optional status filter, oldest first
    pub fn list_matches(&self, status: Option<MatchStatus>) -> Result<Vec<Match>, EngineError> {
        let store = self.store()?;
        let mut matches: Vec<Match> = store
            .matches()
            .filter(|record| status.map_or(true, |s| record.status == s))
            .cloned()
            .collect();
        matches.sort_by_key(|record| (record.created_at, record.id));
        Ok(matches)
    }

    /// Aggregate queue health numbers over a consistent snapshot
    pub fn stats(&self) -> Result<QueueStats, EngineError> {
        let store = self.store()?;
        Ok(stats::compute(store.items(), store.matches(), Utc::now()))
    }

    /// Ranked uncommitted pairings for manager review
    pub fn opportunities(&self) -> Result<Vec<Opportunity>, EngineError> {
        let store = self.store()?;
        let withdrawals = store.pending_of_kind(ItemKind::Withdrawal);
        let deposits = store.pending_of_kind(ItemKind::Deposit);
        Ok(matcher::rank_opportunities(
            withdrawals,
            deposits,
            Utc::now(),
        ))
    }

    // ── Internal ────────────────────────────────────────────────────

    fn store(&self) -> Result<MutexGuard<'_, QueueStore>, EngineError> {
        self.state
            .lock()
            .map_err(|_| EngineError::Storage("engine state lock poisoned".to_string()))
    }

    /// Called strictly after the state lock is released
    fn publish(&self, events: &[QueueEvent]) {
        if let Some(sink) = &self.sink {
            for event in events {
                sink.publish(event);
            }
        }
    }
}
