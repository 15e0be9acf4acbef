use queue_engine::Opportunity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{CustomerId, MatchId};
use types::item::{ItemKind, ItemStatus, QueueItem};
use types::match_record::Match;
use types::payment::PaymentMethod;

/// Body for both enqueue routes; the route decides withdrawal vs deposit
#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueRequest {
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_details: String,
    #[serde(default)]
    pub priority: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Enqueue result: the stored item plus the match when one was made
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
    pub item: QueueItem,
    #[serde(rename = "match")]
    pub match_record: Option<Match>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListItemsQuery {
    pub status: Option<ItemStatus>,
    pub kind: Option<ItemKind>,
}

/// Empty or missing list means "process all pending matches"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub match_ids: Vec<MatchId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    pub processed: Vec<Match>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FailRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpportunitiesResponse {
    pub opportunities: Vec<Opportunity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitResponse {
    pub durable: bool,
    pub items: usize,
    pub matches: usize,
}
