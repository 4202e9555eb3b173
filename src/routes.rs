//! API route handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Datelike;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::ingest::SOURCE_TAG;
use crate::jobs::{JobRegistry, JobStatus};
use crate::provider::{HttpProvider, ScheduleEntry, SessionProvider};
use crate::storage::Repository;
use crate::types::{
    ErrorResponse, HealthResponse, JobStatusResponse, LoadSessionRequest, LoadSessionResponse,
    RoundsQuery, SessionQuery, SessionResultRow,
};

/// First season the data service covers.
const FIRST_YEAR: i32 = 2002;

/// Application state shared across handlers.
pub struct AppState {
    pub config: AppConfig,
    pub provider: Arc<HttpProvider>,
    pub jobs: JobRegistry,
}

impl AppState {
    fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.config.database.path)
    }
}

/// Error type for API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.status.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Seasons available for loading.
pub async fn years() -> Json<Vec<i32>> {
    let current = chrono::Utc::now().year();
    Json((FIRST_YEAR..=current).collect())
}

/// Event schedule for a year, straight from the provider.
pub async fn rounds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoundsQuery>,
) -> Result<Json<Vec<ScheduleEntry>>, ApiError> {
    let Some(year) = query.year else {
        return Err(ApiError::bad_request("year is required"));
    };

    let provider = state.provider.clone();
    let entries = tokio::task::spawn_blocking(move || provider.fetch_event_schedule(year))
        .await
        .map_err(|e| ApiError::internal(format!("Schedule task failed: {}", e)))?
        .map_err(|e| ApiError::internal(format!("Failed to fetch schedule: {:#}", e)))?;

    Ok(Json(entries))
}

/// Stored results for one session. Unknown sessions read as empty.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Vec<SessionResultRow>>, ApiError> {
    let (Some(year), Some(round), Some(session)) = (query.year, query.round, query.session) else {
        return Err(ApiError::bad_request("year, round, session are required"));
    };

    let db_path = state.db_path();
    let rows = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<SessionResultRow>> {
        let repo = Repository::open(&db_path)?;
        repo.session_results(year, round, &session, SOURCE_TAG)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Query task failed: {}", e)))?
    .map_err(|e| ApiError::internal(format!("Failed to query session: {:#}", e)))?;

    Ok(Json(rows))
}

/// Enqueue ingestion of one session and return the job handle.
pub async fn load_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadSessionRequest>,
) -> Json<LoadSessionResponse> {
    let job_id = state
        .jobs
        .submit(
            state.provider.clone(),
            state.db_path(),
            req.year,
            req.round,
            req.session,
        )
        .await;

    Json(LoadSessionResponse { job_id })
}

/// Poll a job's status.
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let id = Uuid::parse_str(&job_id).map_err(|_| ApiError::not_found("job not found"))?;
    let Some(status) = state.jobs.status(&id).await else {
        return Err(ApiError::not_found("job not found"));
    };

    let (result, error) = match &status {
        JobStatus::Finished(report) => (Some(*report), None),
        JobStatus::Failed(message) => (None, Some(message.clone())),
        _ => (None, None),
    };

    Ok(Json(JobStatusResponse {
        job_id,
        status: status.as_str().to_string(),
        result,
        error,
    }))
}
