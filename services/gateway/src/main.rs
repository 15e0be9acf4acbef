use gateway::{create_router, AppState, GatewayConfig};
use queue_engine::events::QueueEvent;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tracing::info!("Starting queue gateway");

    let config = GatewayConfig::from_env()?;
    let state = AppState::new(&config)?;

    // Downstream notification consumer: settlement outcomes are logged here;
    // a ledger poster or customer notifier subscribes the same way.
    let mut events = state.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(QueueEvent::MatchCompleted { match_id, .. }) => {
                    tracing::info!(%match_id, "match settled, notify both customers");
                }
                Ok(QueueEvent::MatchFailed { match_id, reason, .. }) => {
                    tracing::warn!(%match_id, %reason, "match failed, notify both customers");
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "notification consumer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let app = create_router(state);
    let listener = TcpListener::bind(config.bind).await?;
    tracing::info!("Listening on {}", config.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
