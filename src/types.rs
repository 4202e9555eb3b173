//! Request and response types for the Pitwall API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::IngestReport;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// One stored session result, joined with driver and team.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResultRow {
    pub position: Option<i64>,
    pub driver: String,
    pub team: String,
    pub status: Option<String>,
    pub q1: Option<f64>,
    pub q2: Option<f64>,
    pub q3: Option<f64>,
    pub best_lap: Option<f64>,
    pub laps: Option<i64>,
    pub main_compound: Option<String>,
}

/// Query parameters for `/api/rounds`.
#[derive(Debug, Deserialize)]
pub struct RoundsQuery {
    pub year: Option<i32>,
}

/// Query parameters for `/api/session`.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub year: Option<i32>,
    pub round: Option<i32>,
    pub session: Option<String>,
}

/// Request body for `/api/load-session`.
#[derive(Debug, Deserialize)]
pub struct LoadSessionRequest {
    pub year: i32,
    pub round: i32,
    pub session: String,
}

/// Response for `/api/load-session`.
#[derive(Debug, Serialize)]
pub struct LoadSessionResponse {
    pub job_id: Uuid,
}

/// Response for `/api/jobs/{id}`.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<IngestReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
