//! Queue statistics reporter
//!
//! Read-only aggregation over a store snapshot for monitoring: queue depth,
//! wait times, and match success rate. Never mutates state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::item::{ItemKind, ItemStatus, QueueItem};
use types::match_record::{Match, MatchStatus};

/// Aggregate queue health numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_items: usize,
    pub pending_withdrawals: usize,
    pub pending_deposits: usize,
    pub matched_items: usize,
    pub processing_items: usize,
    pub completed_items: usize,
    pub cancelled_items: usize,
    pub failed_items: usize,
    /// Average wait of still-Pending items, in whole seconds
    pub average_pending_wait_secs: i64,
    pub total_matches: usize,
    pub completed_matches: usize,
    pub failed_matches: usize,
    /// Completed matches over all matches ever created (0.0 when none)
    pub match_success_rate: f64,
    /// Sum of settled amounts across completed matches
    pub completed_volume: Decimal,
}

/// Compute stats over a consistent snapshot
pub fn compute<'a>(
    items: impl Iterator<Item = &'a QueueItem>,
    matches: impl Iterator<Item = &'a Match>,
    now: DateTime<Utc>,
) -> QueueStats {
    let mut stats = QueueStats {
        total_items: 0,
        pending_withdrawals: 0,
        pending_deposits: 0,
        matched_items: 0,
        processing_items: 0,
        completed_items: 0,
        cancelled_items: 0,
        failed_items: 0,
        average_pending_wait_secs: 0,
        total_matches: 0,
        completed_matches: 0,
        failed_matches: 0,
        match_success_rate: 0.0,
        completed_volume: Decimal::ZERO,
    };

    let mut pending_count = 0i64;
    let mut pending_wait_secs = 0i64;

    for item in items {
        stats.total_items += 1;
        match item.status {
            ItemStatus::Pending => {
                match item.kind {
                    ItemKind::Withdrawal => stats.pending_withdrawals += 1,
                    ItemKind::Deposit => stats.pending_deposits += 1,
                }
                pending_count += 1;
                pending_wait_secs += (now - item.created_at).num_seconds().max(0);
            }
            ItemStatus::Matched => stats.matched_items += 1,
            ItemStatus::Processing => stats.processing_items += 1,
            ItemStatus::Completed => stats.completed_items += 1,
            ItemStatus::Cancelled => stats.cancelled_items += 1,
            ItemStatus::Failed => stats.failed_items += 1,
        }
    }

    if pending_count > 0 {
        stats.average_pending_wait_secs = pending_wait_secs / pending_count;
    }

    for record in matches {
        stats.total_matches += 1;
        match record.status {
            MatchStatus::Completed => {
                stats.completed_matches += 1;
                stats.completed_volume += record.amount.as_decimal();
            }
            MatchStatus::Failed => stats.failed_matches += 1,
            MatchStatus::Pending | MatchStatus::Processing => {}
        }
    }

    if stats.total_matches > 0 {
        stats.match_success_rate = stats.completed_matches as f64 / stats.total_matches as f64;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{CustomerId, ItemId};
    use types::money::Amount;
    use types::payment::PaymentMethod;

    fn item_with_status(kind: ItemKind, status: ItemStatus, wait_secs: i64) -> QueueItem {
        let mut item = QueueItem::new(
            kind,
            CustomerId::new(),
            Amount::from_u64(100),
            PaymentMethod::Cash,
            String::new(),
            1,
            None,
            Utc::now() - chrono::Duration::seconds(wait_secs),
        );
        item.status = status;
        if status != ItemStatus::Pending && status != ItemStatus::Cancelled {
            item.matched_with = Some(types::ids::MatchId::new());
        }
        item
    }

    fn match_with_status(status: MatchStatus, amount: u64) -> Match {
        let mut record = Match::new(
            ItemId::new(),
            ItemId::new(),
            Amount::from_u64(amount),
            150,
            Utc::now(),
        );
        record.status = status;
        record
    }

    #[test]
    fn test_empty_snapshot() {
        let stats = compute(std::iter::empty(), std::iter::empty(), Utc::now());
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.average_pending_wait_secs, 0);
        assert_eq!(stats.match_success_rate, 0.0);
    }

    #[test]
    fn test_counts_by_status_and_kind() {
        let items = vec![
            item_with_status(ItemKind::Withdrawal, ItemStatus::Pending, 0),
            item_with_status(ItemKind::Deposit, ItemStatus::Pending, 0),
            item_with_status(ItemKind::Deposit, ItemStatus::Pending, 0),
            item_with_status(ItemKind::Withdrawal, ItemStatus::Matched, 0),
            item_with_status(ItemKind::Deposit, ItemStatus::Completed, 0),
            item_with_status(ItemKind::Withdrawal, ItemStatus::Cancelled, 0),
        ];
        let stats = compute(items.iter(), std::iter::empty(), Utc::now());
        assert_eq!(stats.total_items, 6);
        assert_eq!(stats.pending_withdrawals, 1);
        assert_eq!(stats.pending_deposits, 2);
        assert_eq!(stats.matched_items, 1);
        assert_eq!(stats.completed_items, 1);
        assert_eq!(stats.cancelled_items, 1);
    }

    #[test]
    fn test_average_pending_wait() {
        let items = vec![
            item_with_status(ItemKind::Withdrawal, ItemStatus::Pending, 60),
            item_with_status(ItemKind::Deposit, ItemStatus::Pending, 120),
            // Non-pending items never enter the average
            item_with_status(ItemKind::Deposit, ItemStatus::Completed, 100_000),
        ];
        let stats = compute(items.iter(), std::iter::empty(), Utc::now());
        assert!((89..=91).contains(&stats.average_pending_wait_secs));
    }

    #[test]
    fn test_success_rate_and_volume() {
        let matches = vec![
            match_with_status(MatchStatus::Completed, 100),
            match_with_status(MatchStatus::Completed, 50),
            match_with_status(MatchStatus::Failed, 75),
            match_with_status(MatchStatus::Pending, 200),
        ];
        let stats = compute(std::iter::empty(), matches.iter(), Utc::now());
        assert_eq!(stats.total_matches, 4);
        assert_eq!(stats.completed_matches, 2);
        assert_eq!(stats.failed_matches, 1);
        assert!((stats.match_success_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(stats.completed_volume, Decimal::from(150));
    }
}
