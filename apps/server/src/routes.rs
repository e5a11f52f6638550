//! HTTP routes and handlers.
//!
//! ```text
//! POST /api/login                      authenticate against the upstream
//! POST /api/sync/all                   run the full reference-data cascade
//! GET  /api/sync/history               50 most recent audit records
//! GET  /api/reading-cases              mirrored reading cases
//! GET  /api/reading-anomalies          mirrored reading anomalies
//! GET  /api/reading-anomaly-cases      mirrored anomaly cases (?caseId=N)
//! GET  /api/incident-types             mirrored incident types
//! GET  /health                         liveness + database reachability
//! ```
//!
//! All response bodies are camelCase JSON.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use waterline_core::{
    LookupItem, LookupKind, ReadingAnomaly, ReadingAnomalyCase, ReadingCase, Session, SyncRecord,
    SYNC_HISTORY_LIMIT,
};
use waterline_db::Database;
use waterline_sync::{HttpUpstream, Reconciler, SyncError};

use crate::error::ApiError;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub reconciler: Reconciler<HttpUpstream>,
    pub upstream: HttpUpstream,
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/sync/all", post(sync_all))
        .route("/api/sync/history", get(sync_history))
        .route("/api/reading-cases", get(reading_cases))
        .route("/api/reading-anomalies", get(reading_anomalies))
        .route("/api/reading-anomaly-cases", get(reading_anomaly_cases))
        .route("/api/incident-types", get(incident_types))
        .route("/health", get(health))
        .with_state(state)
}

// =============================================================================
// Request payloads
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyCaseQuery {
    pub case_id: Option<i64>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Authenticates a technician against the upstream and stores the session.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    let payload = state
        .upstream
        .login(&req.username, &req.password)
        .await
        .map_err(|e| match e {
            SyncError::Unauthorized => ApiError::InvalidCredentials,
            other => ApiError::LoginFailed(other.to_string()),
        })?;

    let session = Session::from(payload);
    state
        .db
        .sessions()
        .insert(&session)
        .await
        .map_err(|e| ApiError::LoginFailed(e.to_string()))?;

    info!(user_id = session.user_id, username = %session.username, "Technician logged in");
    Ok(Json(session))
}

/// Runs the full reference-data cascade for the requesting technician.
async fn sync_all(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<Value>, ApiError> {
    let records = state
        .reconciler
        .run_full_sync(req.user_id, &req.token)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "All data synced successfully",
        "records": records,
    })))
}

/// Returns the most recent sync audit records, newest first.
async fn sync_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SyncRecord>>, ApiError> {
    let records = state.db.sync_history().recent(SYNC_HISTORY_LIMIT).await?;
    Ok(Json(records))
}

async fn reading_cases(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReadingCase>>, ApiError> {
    Ok(Json(state.db.reference().reading_cases().await?))
}

async fn reading_anomalies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReadingAnomaly>>, ApiError> {
    Ok(Json(state.db.reference().reading_anomalies().await?))
}

async fn reading_anomaly_cases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnomalyCaseQuery>,
) -> Result<Json<Vec<ReadingAnomalyCase>>, ApiError> {
    Ok(Json(
        state
            .db
            .reference()
            .reading_anomaly_cases(query.case_id)
            .await?,
    ))
}

async fn incident_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LookupItem>>, ApiError> {
    Ok(Json(
        state.db.reference().lookup(LookupKind::IncidentType).await?,
    ))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = if state.db.health_check().await {
        "ok"
    } else {
        "unreachable"
    };
    Json(json!({ "status": "ok", "database": database }))
}
