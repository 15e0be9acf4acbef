use crate::config::GatewayConfig;
use crate::rate_limit::RateLimiter;
use queue_engine::{EngineConfig, EventSink, QueueEngine};
use queue_engine::events::QueueEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Forwards committed engine events onto the broadcast channel for
/// downstream ledger/notification consumers. Lagging receivers drop
/// events; the journal remains the source of truth.
struct ChannelSink {
    tx: broadcast::Sender<QueueEvent>,
}

impl EventSink for ChannelSink {
    fn publish(&self, event: &QueueEvent) {
        // Send fails only when nobody is subscribed, which is fine
        let _ = self.tx.send(event.clone());
    }
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QueueEngine>,
    pub rate_limiter: Arc<RateLimiter>,
    pub events: broadcast::Sender<QueueEvent>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(config: &GatewayConfig) -> Result<Self, anyhow::Error> {
        let (tx, _) = broadcast::channel(256);
        let sink = Arc::new(ChannelSink { tx: tx.clone() });
        let engine = QueueEngine::open(EngineConfig {
            data_dir: config.data_dir.clone(),
        })?
        .with_sink(sink);

        Ok(Self {
            engine: Arc::new(engine),
            rate_limiter: Arc::new(RateLimiter::new()),
            events: tx,
            jwt_secret: config.jwt_secret.as_str().into(),
        })
    }

    /// Subscribe to committed queue events
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }
}
