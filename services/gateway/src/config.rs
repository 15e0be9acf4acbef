use std::net::SocketAddr;
use std::path::PathBuf;

/// Gateway configuration, read from the environment
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    /// Journal directory; unset runs the queue in memory only
    pub data_dir: Option<PathBuf>,
    pub jwt_secret: String,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let bind = match std::env::var("QUEUE_BIND") {
            Ok(raw) => raw.parse()?,
            Err(_) => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };
        let data_dir = std::env::var("QUEUE_DATA_DIR").ok().map(PathBuf::from);
        let jwt_secret = match std::env::var("QUEUE_JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) => {
                tracing::warn!("QUEUE_JWT_SECRET not set, using development secret");
                "dev-secret".to_string()
            }
        };
        Ok(Self {
            bind,
            data_dir,
            jwt_secret,
        })
    }
}
