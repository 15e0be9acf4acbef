//! Compatibility scoring
//!
//! Pure, deterministic, side-effect-free scoring of one withdrawal against
//! one deposit candidate. Scores are only ever compared relative to each
//! other within a single matching decision, never against a threshold.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use types::item::QueueItem;

/// Every eligible pair starts here
pub const BASE_SCORE: i64 = 100;

/// Explicit weighted term for the method match. Already guaranteed by the
/// eligibility check, kept as its own term for extensibility.
pub const METHOD_MATCH_BONUS: i64 = 20;

/// Wait bonus cap: 1 point per full minute waited, at most 20
pub const MAX_WAIT_BONUS: i64 = 20;

/// Disqualifying checks. Any failure makes the pair ineligible; the matcher
/// must never create a match for an ineligible pair.
///
/// Rejects when the payment methods differ, the deposit cannot cover the
/// withdrawal, or both items belong to the same customer.
pub fn eligible(withdrawal: &QueueItem, deposit: &QueueItem) -> bool {
    withdrawal.payment_method == deposit.payment_method
        && deposit.amount.covers(&withdrawal.amount)
        && withdrawal.customer_id != deposit.customer_id
}

/// Score an eligible pair; `None` means ineligible (not a low score).
///
/// `trigger_created_at` is the creation time of whichever item triggered
/// the scan; its accrued wait feeds the anti-starvation bonus.
pub fn score(
    withdrawal: &QueueItem,
    deposit: &QueueItem,
    trigger_created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<i64> {
    if !eligible(withdrawal, deposit) {
        return None;
    }

    let mut total = BASE_SCORE + METHOD_MATCH_BONUS;
    total += closeness_bonus(withdrawal.amount.abs_diff(&deposit.amount));
    total += wait_bonus(trigger_created_at, now);
    Some(total)
}

/// Amount-closeness bonus, smallest applicable bucket wins
fn closeness_bonus(diff: Decimal) -> i64 {
    if diff < Decimal::from(10) {
        30
    } else if diff < Decimal::from(50) {
        20
    } else if diff < Decimal::from(100) {
        10
    } else {
        0
    }
}

/// 1 point per full minute waited, capped
fn wait_bonus(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_minutes().clamp(0, MAX_WAIT_BONUS)
}
