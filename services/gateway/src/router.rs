use crate::handlers::{admin, queue};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/admin/init", post(admin::init))
        .route("/queue/withdrawals", post(queue::enqueue_withdrawal))
        .route("/queue/deposits", post(queue::enqueue_deposit))
        .route("/queue/stats", get(queue::get_stats))
        .route("/queue/items", get(queue::list_items))
        .route("/queue/items/{id}/cancel", post(queue::cancel_item))
        .route("/queue/items/{id}/requeue", post(queue::requeue_item))
        .route("/queue/opportunities", get(queue::list_opportunities))
        .route("/queue/process", post(queue::process_matches))
        .route("/queue/matches/{id}/complete", post(queue::complete_match))
        .route("/queue/matches/{id}/fail", post(queue::fail_match));

    Router::new()
        .nest("/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
