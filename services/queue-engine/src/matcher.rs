//! Candidate selection
//!
//! Given a newly inserted item (or the whole pending set for the manager
//! view), find the best-scoring eligible counterpart. Selection is pure;
//! committing a match is the store's transactional concern.

use crate::scoring;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::ids::ItemId;
use types::item::{ItemKind, QueueItem};
use types::money::Amount;
use types::payment::PaymentMethod;

/// A potential pairing surfaced for manager review, never committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub withdrawal_id: ItemId,
    pub deposit_id: ItemId,
    pub score: i64,
    pub amount: Amount,
    pub payment_method: PaymentMethod,
}

/// The winning candidate for one matching decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub item_id: ItemId,
    pub score: i64,
}

/// Select the best eligible counterpart for `item` among `pending`.
///
/// Ties break on earliest `created_at` (FIFO fairness), then on the lower
/// item id — a total order, so the decision is deterministic.
pub fn best_candidate<'a>(
    item: &QueueItem,
    pending: impl IntoIterator<Item = &'a QueueItem>,
    now: DateTime<Utc>,
) -> Option<Candidate> {
    let mut best: Option<(i64, &QueueItem)> = None;

    for candidate in pending {
        if candidate.kind != item.kind.opposite() || !candidate.is_pending() {
            continue;
        }
        let (withdrawal, deposit) = orient(item, candidate);
        let Some(score) = scoring::score(withdrawal, deposit, item.created_at, now) else {
            continue;
        };
        let beats_current = match best {
            None => true,
            Some((best_score, best_item)) => {
                score > best_score
                    || (score == best_score
                        && (candidate.created_at, candidate.id)
                            < (best_item.created_at, best_item.id))
            }
        };
        if beats_current {
            best = Some((score, candidate));
        }
    }

    best.map(|(score, candidate)| Candidate {
        item_id: candidate.id,
        score,
    })
}

/// Batch "find opportunities" mode for the manager view.
///
/// Scores every pending withdrawal against every pending deposit and returns
/// the ranked list. Read-only; results are consistent with what the live
/// matcher would choose for each withdrawal, modulo later insertions.
pub fn rank_opportunities<'a>(
    withdrawals: impl IntoIterator<Item = &'a QueueItem>,
    deposits: impl IntoIterator<Item = &'a QueueItem> + Clone,
    now: DateTime<Utc>,
) -> Vec<Opportunity> {
    let mut ranked = Vec::new();

    for withdrawal in withdrawals {
        if !withdrawal.is_pending() {
            continue;
        }
        for deposit in deposits.clone() {
            if !deposit.is_pending() {
                continue;
            }
            // Wait bonus from the withdrawal's age: constant per withdrawal,
            // so relative ranking of its candidates matches live matching.
            if let Some(score) = scoring::score(withdrawal, deposit, withdrawal.created_at, now) {
                ranked.push((
                    Opportunity {
                        withdrawal_id: withdrawal.id,
                        deposit_id: deposit.id,
                        score,
                        amount: withdrawal.amount,
                        payment_method: withdrawal.payment_method,
                    },
                    withdrawal.created_at,
                    deposit.created_at,
                ));
            }
        }
    }

    ranked.sort_by(|a, b| {
        b.0.score
            .cmp(&a.0.score)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
            .then(a.0.withdrawal_id.cmp(&b.0.withdrawal_id))
            .then(a.0.deposit_id.cmp(&b.0.deposit_id))
    });
    ranked.into_iter().map(|(opportunity, _, _)| opportunity).collect()
}

/// Orient a (trigger, candidate) pair as (withdrawal, deposit)
fn orient<'a>(item: &'a QueueItem, candidate: &'a QueueItem) -> (&'a QueueItem, &'a QueueItem) {
    match item.kind {
        ItemKind::Withdrawal => (item, candidate),
        ItemKind::Deposit => (candidate, item),
    }
}
