use crate::auth::Manager;
use crate::error::AppError;
use crate::models::InitResponse;
use crate::state::AppState;
use axum::{extract::State, Json};

/// Idempotent storage initialization; reports what the journal replayed
pub async fn init(
    State(state): State<AppState>,
    manager: Manager,
) -> Result<Json<InitResponse>, AppError> {
    let report = state.engine.initialize()?;
    tracing::info!(
        by = %manager.subject,
        durable = report.durable,
        items = report.items,
        "queue initialized"
    );
    Ok(Json(InitResponse {
        durable: report.durable,
        items: report.items,
        matches: report.matches,
    }))
}
