//! Read-only REST API over the indexed events.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db;
use crate::errors::IndexerError;
use crate::events::{EventRecord, ProjectStatusRecord};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventsResponse {
    pub project_id: String,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Restrict to one stored `event_type`, e.g. `status_changed`.
    pub event_type: Option<String>,
}

impl IntoResponse for IndexerError {
    fn into_response(self) -> Response {
        let status = match self {
            IndexerError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /events?event_type=…`
pub async fn get_all_events(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<AllEventsResponse>, IndexerError> {
    let events = db::get_all_events(&state.pool, query.event_type.as_deref()).await?;
    Ok(Json(AllEventsResponse {
        count: events.len(),
        events,
    }))
}

/// `GET /projects/:id/events`, with `id` the hex project id.
pub async fn get_project_events(
    State(state): State<Arc<ApiState>>,
    Path(project_id): Path<String>,
) -> Result<Json<EventsResponse>, IndexerError> {
    let events = db::get_events_for_project(&state.pool, &project_id).await?;
    Ok(Json(EventsResponse {
        project_id,
        count: events.len(),
        events,
    }))
}

/// `GET /projects/:id/status`
pub async fn get_project_status(
    State(state): State<Arc<ApiState>>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectStatusRecord>, IndexerError> {
    db::get_project_status(&state.pool, &project_id)
        .await?
        .map(Json)
        .ok_or_else(|| IndexerError::NotFound(format!("no status indexed for {project_id}")))
}
