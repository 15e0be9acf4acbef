use crate::auth::{AuthenticatedUser, Manager};
use crate::error::AppError;
use crate::models::{
    CompleteRequest, EnqueueRequest, EnqueueResponse, FailRequest, ListItemsQuery,
    OpportunitiesResponse, ProcessRequest, ProcessResponse,
};
use crate::rate_limit;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use queue_engine::{EnqueueOutcome, NewItem, QueueStats};
use types::ids::{ItemId, MatchId};
use types::item::{ItemKind, QueueItem};
use types::match_record::Match;

fn enqueue_response(outcome: EnqueueOutcome) -> (StatusCode, Json<EnqueueResponse>) {
    let (item, match_record) = match outcome {
        EnqueueOutcome::Pending { item } => (item, None),
        EnqueueOutcome::Matched { item, record } => (item, Some(record)),
    };
    (
        StatusCode::CREATED,
        Json(EnqueueResponse { item, match_record }),
    )
}

async fn enqueue(
    state: AppState,
    user: AuthenticatedUser,
    kind: ItemKind,
    payload: EnqueueRequest,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    state
        .rate_limiter
        .check(&user.subject, "enqueue", rate_limit::ENQUEUE)?;

    let outcome = state.engine.enqueue(NewItem {
        kind,
        customer_id: payload.customer_id,
        amount: payload.amount,
        payment_method: payload.payment_method,
        payment_details: payload.payment_details,
        priority: payload.priority,
        notes: payload.notes,
    })?;
    Ok(enqueue_response(outcome))
}

pub async fn enqueue_withdrawal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    enqueue(state, user, ItemKind::Withdrawal, payload).await
}

pub async fn enqueue_deposit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    enqueue(state, user, ItemKind::Deposit, payload).await
}

pub async fn get_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<QueueStats>, AppError> {
    state
        .rate_limiter
        .check(&user.subject, "stats", rate_limit::READ)?;
    Ok(Json(state.engine.stats()?))
}

pub async fn list_items(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Vec<QueueItem>>, AppError> {
    state
        .rate_limiter
        .check(&user.subject, "list", rate_limit::READ)?;
    Ok(Json(state.engine.list_items(query.status, query.kind)?))
}

pub async fn cancel_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<ItemId>,
) -> Result<Json<QueueItem>, AppError> {
    state
        .rate_limiter
        .check(&user.subject, "cancel", rate_limit::LIFECYCLE)?;
    Ok(Json(state.engine.cancel_item(id)?))
}

pub async fn list_opportunities(
    State(state): State<AppState>,
    manager: Manager,
) -> Result<Json<OpportunitiesResponse>, AppError> {
    state
        .rate_limiter
        .check(&manager.subject, "opportunities", rate_limit::READ)?;
    Ok(Json(OpportunitiesResponse {
        opportunities: state.engine.opportunities()?,
    }))
}

pub async fn process_matches(
    State(state): State<AppState>,
    manager: Manager,
    payload: Option<Json<ProcessRequest>>,
) -> Result<Json<ProcessResponse>, AppError> {
    state
        .rate_limiter
        .check(&manager.subject, "process", rate_limit::LIFECYCLE)?;
    let ids = payload.map(|Json(p)| p.match_ids).unwrap_or_default();
    let processed = state.engine.process_matches(&ids)?;
    Ok(Json(ProcessResponse { processed }))
}

pub async fn complete_match(
    State(state): State<AppState>,
    manager: Manager,
    Path(id): Path<MatchId>,
    payload: Option<Json<CompleteRequest>>,
) -> Result<Json<Match>, AppError> {
    state
        .rate_limiter
        .check(&manager.subject, "complete", rate_limit::LIFECYCLE)?;
    let notes = payload.and_then(|Json(p)| p.notes);
    Ok(Json(state.engine.complete_match(id, notes)?))
}

pub async fn fail_match(
    State(state): State<AppState>,
    manager: Manager,
    Path(id): Path<MatchId>,
    Json(payload): Json<FailRequest>,
) -> Result<Json<Match>, AppError> {
    state
        .rate_limiter
        .check(&manager.subject, "fail", rate_limit::LIFECYCLE)?;
    Ok(Json(state.engine.fail_match(id, payload.reason)?))
}

pub async fn requeue_item(
    State(state): State<AppState>,
    manager: Manager,
    Path(id): Path<ItemId>,
) -> Result<Json<QueueItem>, AppError> {
    state
        .rate_limiter
        .check(&manager.subject, "requeue", rate_limit::LIFECYCLE)?;
    Ok(Json(state.engine.requeue_item(id)?))
}
