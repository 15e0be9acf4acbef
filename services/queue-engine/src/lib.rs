//! Queue Matching Engine
//!
//! Pairs pending withdrawal requests with pending deposit requests from
//! different customers, scores candidate pairings, and drives them through
//! a transactional lifecycle from pending to completed.
//!
//! **Key Invariants:**
//! - At most one active match per queue item
//! - `Pending` items carry no match reference; matched-path items always do
//! - A match's two items belong to different customers
//! - Deterministic tie-breaking (score, then FIFO, then id order)
//! - Rejected transitions leave state unchanged

pub mod engine;
pub mod events;
pub mod journal;
pub mod matcher;
pub mod scoring;
pub mod stats;
pub mod store;

pub use engine::{EngineConfig, EnqueueOutcome, EventSink, NewItem, QueueEngine};
pub use matcher::Opportunity;
pub use stats::QueueStats;
