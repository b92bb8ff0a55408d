// Copyright (c) 2026 Trusted Revenue Systems
// SPDX-License-Identifier: AGPL-3.0
//! HTTP API over [`AgentActions`].
//!
//! | Method | Path | Action |
//! |--------|------|--------|
//! | GET | `/health` | liveness and uptime |
//! | GET | `/api/agents` | list with governance applied |
//! | POST | `/api/agents/{key}/run` | run (JSON body is the payload) |
//! | GET | `/api/agents/{key}/logs?limit=N` | run log, newest first |
//! | GET | `/api/agents/{key}/runs?limit=N` | persisted run history |
//! | POST | `/api/agents/{key}/toggle` | `{"enabled": bool}` |
//! | GET | `/api/agents/events?agent=KEY` | server-sent bus events, optionally for one agent |
//!
//! Callers authenticate with `Authorization: Bearer <token>`.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::application::actions::{ActionError, AgentActions};
use crate::domain::agent::AgentKey;
use crate::domain::auth::Credentials;
use crate::infrastructure::event_bus::{EventBus, EventBusError};

#[derive(Clone)]
pub struct AppState {
    pub actions: Arc<AgentActions>,
    pub events: Option<EventBus>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(actions: Arc<AgentActions>) -> Self {
        Self {
            actions,
            events: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/agents", get(list_agents_handler))
        .route("/api/agents/events", get(stream_events_handler))
        .route("/api/agents/{key}/run", post(run_agent_handler))
        .route("/api/agents/{key}/logs", get(logs_handler))
        .route("/api/agents/{key}/runs", get(run_history_handler))
        .route("/api/agents/{key}/toggle", post(toggle_agent_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Maps facade errors onto status codes.
pub struct ApiError(ActionError);

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            ActionError::Unauthenticated { redirect_to } => {
                (StatusCode::UNAUTHORIZED, json!({ "redirect": redirect_to }))
            }
            ActionError::MissingOrganization => (StatusCode::BAD_REQUEST, json!({ "error": self.0.to_string() })),
            ActionError::UnknownAgent(_) => (StatusCode::NOT_FOUND, json!({ "error": self.0.to_string() })),
            ActionError::AgentFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": self.0.to_string() }))
            }
            ActionError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": self.0.to_string() }))
            }
        };
        (status, Json(body)).into_response()
    }
}

fn credentials(headers: &HeaderMap) -> Credentials {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| Credentials::bearer(token.trim()))
        .unwrap_or_default()
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "agents": state.actions.bus().len(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn list_agents_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response, ApiError> {
    let agents = state.actions.action_list_agents(&credentials(&headers)).await?;
    Ok(Json(agents).into_response())
}

async fn run_agent_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                return Ok((
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("invalid JSON payload: {}", e) })),
                )
                    .into_response())
            }
        }
    };

    let result = state
        .actions
        .action_run_agent(&credentials(&headers), &AgentKey::new(key), payload)
        .await?;
    Ok(Json(result).into_response())
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    limit: Option<usize>,
}

async fn logs_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Response {
    Json(state.actions.action_logs(&AgentKey::new(key), query.limit)).into_response()
}

async fn run_history_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Query(query): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    let runs = state
        .actions
        .action_run_history(&credentials(&headers), &AgentKey::new(key), query.limit)
        .await?;
    Ok(Json(runs).into_response())
}

#[derive(Debug, Deserialize)]
struct ToggleRequest {
    enabled: bool,
}

async fn toggle_agent_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ToggleRequest>,
) -> Result<Response, ApiError> {
    let status = state
        .actions
        .action_toggle_agent(&credentials(&headers), &AgentKey::new(key), request.enabled)
        .await?;
    Ok(Json(status).into_response())
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    agent: Option<String>,
}

async fn stream_events_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    state.actions.authenticate(&credentials(&headers)).await?;

    let agent = query.agent.map(AgentKey::new);
    if let Some(key) = &agent {
        if !state.actions.bus().contains(key) {
            return Err(ActionError::UnknownAgent(key.clone()).into());
        }
    }

    let receiver = state.events.as_ref().map(|events| match agent {
        Some(key) => events.subscribe_agent(key),
        None => events.subscribe(),
    });
    let stream = stream::unfold(receiver, |receiver| async move {
        let mut receiver = receiver?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some((Event::default().json_data(&event), Some(receiver))),
                Err(EventBusError::Lagged(_)) => continue,
                Err(EventBusError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
