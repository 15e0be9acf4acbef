//! Concurrent-insertion stress: many threads enqueue at once and no item
//! may ever be claimed by two live matches.

use queue_engine::{NewItem, QueueEngine};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use types::ids::{CustomerId, ItemId};
use types::item::{ItemKind, ItemStatus};
use types::payment::PaymentMethod;

fn request(kind: ItemKind, amount: u64) -> NewItem {
    NewItem {
        kind,
        customer_id: CustomerId::new(),
        amount: Decimal::from(amount),
        payment_method: PaymentMethod::Cash,
        payment_details: "in person".to_string(),
        priority: None,
        notes: None,
    }
}

#[test]
fn test_no_item_is_claimed_twice_under_concurrent_enqueue() {
    let engine = Arc::new(QueueEngine::in_memory());
    let threads = 8;
    let per_thread = 25;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let kind = if (t + i) % 2 == 0 {
                        ItemKind::Withdrawal
                    } else {
                        ItemKind::Deposit
                    };
                    // Spread amounts so scoring has real work to do
                    let amount = 50 + ((t * 37 + i * 13) % 200) as u64;
                    engine.enqueue(request(kind, amount)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let items = engine.list_items(None, None).unwrap();
    assert_eq!(items.len(), threads * per_thread);

    // Count live-match references per item
    let mut live_refs: HashMap<ItemId, usize> = HashMap::new();
    for record in engine.list_matches(None).unwrap() {
        assert!(record.is_active(), "nothing was processed, all matches live");
        *live_refs.entry(record.withdrawal_id).or_default() += 1;
        *live_refs.entry(record.deposit_id).or_default() += 1;
    }

    for item in &items {
        let refs = live_refs.get(&item.id).copied().unwrap_or(0);
        assert!(refs <= 1, "item {} claimed by {} matches", item.id, refs);
        match item.status {
            ItemStatus::Pending => {
                assert_eq!(refs, 0);
                assert!(item.matched_with.is_none());
            }
            ItemStatus::Matched => {
                assert_eq!(refs, 1);
                assert!(item.matched_with.is_some());
            }
            other => panic!("unexpected status {other:?} in this workload"),
        }
    }

    // Every match links one withdrawal to one deposit, never same-kind
    let by_id: HashMap<ItemId, _> = items.iter().map(|item| (item.id, item)).collect();
    for record in engine.list_matches(None).unwrap() {
        assert_eq!(by_id[&record.withdrawal_id].kind, ItemKind::Withdrawal);
        assert_eq!(by_id[&record.deposit_id].kind, ItemKind::Deposit);
        assert_ne!(
            by_id[&record.withdrawal_id].customer_id,
            by_id[&record.deposit_id].customer_id
        );
    }
}

#[test]
fn test_concurrent_lifecycle_ops_keep_counts_consistent() {
    let engine = Arc::new(QueueEngine::in_memory());

    // Seed matched pairs
    for _ in 0..20 {
        engine.enqueue(request(ItemKind::Deposit, 100)).unwrap();
        engine.enqueue(request(ItemKind::Withdrawal, 100)).unwrap();
    }
    let matches = engine.list_matches(None).unwrap();
    assert_eq!(matches.len(), 20);
    engine.process_matches(&[]).unwrap();

    // Racing completers and failers: exactly one wins per match
    let handles: Vec<_> = matches
        .iter()
        .flat_map(|record| {
            let id = record.id;
            let complete = Arc::clone(&engine);
            let fail = Arc::clone(&engine);
            [
                thread::spawn(move || complete.complete_match(id, None).is_ok()),
                thread::spawn(move || fail.fail_match(id, "raced".to_string()).is_ok()),
            ]
        })
        .collect();
    let wins = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 20, "exactly one outcome per match");

    let stats = engine.stats().unwrap();
    assert_eq!(stats.completed_matches + stats.failed_matches, 20);
    assert_eq!(stats.completed_items + stats.failed_items, 40);
}
