//! HTTP surface: configuration, routes and the listener

pub mod config;
pub mod error;
pub mod listener;
pub mod routes;
pub mod sse;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use listener::HookServer;
pub use routes::{build_router, HealthResponse, IngestAck};
pub use sse::EventStream;
pub use state::AppState;
