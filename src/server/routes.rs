//! HTTP routes
//!
//! | Method                    | Path                  | Handler          |
//! |---------------------------|-----------------------|------------------|
//! | POST, PUT, PATCH, DELETE  | `/in/{channel}`       | ingest a webhook |
//! | GET                       | `/events/{channel}`   | SSE event stream |
//! | GET                       | `/history/{channel}`  | recent events    |
//! | GET                       | `/health`             | liveness         |
//! | GET                       | `/stats`              | hub counters     |
//!
//! All routes are mounted under the configured prefix (`/api` by default).

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method};
use axum::response::sse::{KeepAlive, KeepAliveStream, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::event::{decode_body, Event, Headers};
use crate::registry::ChannelId;
use crate::server::config::{ServerConfig, MIN_INTERVAL};
use crate::server::error::ApiError;
use crate::server::sse::EventStream;
use crate::server::state::AppState;
use crate::stats::HubStats;

/// Build the complete router
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let api = Router::new()
        .route(
            "/in/{channel}",
            post(ingest).put(ingest).patch(ingest).delete(ingest),
        )
        .route("/events/{channel}", get(stream_events))
        .route("/history/{channel}", get(history))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .layer(DefaultBodyLimit::max(config.max_body_size));

    let prefix = config.normalized_prefix();
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&prefix, api)
    };

    router
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match config.cors_origin.as_deref() {
        None | Some("*") => layer.allow_origin(Any),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
            Err(_) => {
                tracing::warn!(origin = origin, "Invalid CORS origin, allowing any");
                layer.allow_origin(Any)
            }
        },
    }
}

/// Acknowledgement returned to webhook senders
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestAck {
    pub status: String,
    pub id: Uuid,
}

async fn ingest(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestAck>, ApiError> {
    let channel = ChannelId::parse(&channel)?;

    let event = state
        .ingestor
        .ingest(
            channel,
            method.as_str(),
            Headers::from(&headers),
            decode_body(&body),
        )
        .await?;

    Ok(Json(IngestAck {
        status: "ok".to_string(),
        id: event.id,
    }))
}

#[derive(Debug, Default, Deserialize)]
struct StreamParams {
    /// Number of stored events to replay before going live
    history: Option<usize>,
}

async fn stream_events(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(params): Query<StreamParams>,
) -> Result<Sse<KeepAliveStream<EventStream>>, ApiError> {
    let channel = ChannelId::parse(&channel)?;

    let permit = match &state.stream_permits {
        Some(permits) => match Arc::clone(permits).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(channel = %channel, "Event stream rejected: limit reached");
                return Err(ApiError::TooManyStreams);
            }
        },
        None => None,
    };

    // Subscribe before reading the backlog so nothing falls in between
    let subscription = state.registry.open(&channel);

    let backlog = match params.history.unwrap_or(0).min(state.config.history_limit) {
        0 => Vec::new(),
        limit => match state.store.history(&channel, limit).await {
            Ok(mut events) => {
                events.reverse();
                events
            }
            Err(e) => {
                tracing::warn!(channel = %channel, error = %e, "Backlog unavailable");
                Vec::new()
            }
        },
    };

    tracing::debug!(
        channel = %channel,
        subscriber = %subscription.id(),
        backlog = backlog.len(),
        "Event stream opened"
    );

    let stream = EventStream::new(backlog, subscription, permit);
    let keep_alive = state.config.keep_alive_interval.max(MIN_INTERVAL);
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive)))
}

#[derive(Debug, Default, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn history(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Arc<Event>>>, ApiError> {
    let channel = ChannelId::parse(&channel)?;
    let limit = params
        .limit
        .unwrap_or(state.config.history_limit)
        .min(state.config.history_limit);

    let events = state.store.history(&channel, limit).await?;
    Ok(Json(events))
}

/// Health check body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub channels: usize,
    pub subscribers: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.registry.stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        store: state.store.name().to_string(),
        channels: registry.channels,
        subscribers: registry.subscribers,
    })
}

async fn stats(State(state): State<AppState>) -> Json<HubStats> {
    Json(state.metrics.snapshot(state.registry.stats()))
}
