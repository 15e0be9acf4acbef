//! HTTP gateway for the withdrawal/deposit matching queue.
//!
//! Thin transport layer over the engine: JWT auth with user/manager roles,
//! per-subject rate limiting, JSON error bodies, and a broadcast channel
//! that forwards committed queue events to downstream consumers.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod state;

pub use config::GatewayConfig;
pub use router::create_router;
pub use state::AppState;
