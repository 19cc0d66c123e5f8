//! HTTP surface: upload endpoint plus the three scan lookups.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use scanvault_core::store::ScanStore;
use scanvault_core::VaultError;

use crate::service::{ScanQuery, ScanReport, ScanService};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("scan not found")]
    NotFound,

    #[error("invalid max_results: {0:?}")]
    BadMaxResults(String),

    #[error("request body rejected: {0}")]
    Body(BytesRejection),

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason) = match &self {
            ApiError::Vault(VaultError::MalformedDocument(_)) => (StatusCode::BAD_REQUEST, "Malformed XML"),
            ApiError::Vault(e) if e.is_duplicate() => (StatusCode::NOT_ACCEPTABLE, "Duplicate scan entry"),
            ApiError::Vault(VaultError::InvalidRecord { .. }) => (StatusCode::UNPROCESSABLE_ENTITY, "Invalid scan record"),
            ApiError::Vault(_) => (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable"),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Scan not found"),
            ApiError::BadMaxResults(_) => (StatusCode::BAD_REQUEST, "Invalid max_results"),
            ApiError::Body(r) if r.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large")
            }
            ApiError::Body(r) => (r.status(), "Invalid request body"),
            ApiError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
        };
        if status.is_server_error() {
            error!(%status, error = %self, "request failed");
        } else {
            warn!(%status, error = %self, "request rejected");
        }
        (status, Json(json!({ "status": "Failed", "reason": reason }))).into_response()
    }
}

type Shared<S> = Arc<ScanService<S>>;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    max_results: Option<String>,
}

/// Runs a store call on the blocking pool; rusqlite and the store mutex
/// must not hold up the async workers.
async fn blocking<S, T, F>(svc: Shared<S>, f: F) -> Result<T, ApiError>
where
    S: ScanStore + Send + 'static,
    T: Send + 'static,
    F: FnOnce(&ScanService<S>) -> scanvault_core::Result<T> + Send + 'static,
{
    Ok(tokio::task::spawn_blocking(move || f(&svc)).await??)
}

async fn upload<S: ScanStore + Send + 'static>(
    State(svc): State<Shared<S>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = body.map_err(ApiError::Body)?;
    let report = blocking(svc, move |svc| svc.ingest(&body)).await?;
    Ok(Json(json!({ "status": "Success", "results": { "total_hosts": report.total_hosts } })))
}

fn found(reports: Vec<ScanReport>) -> Result<Json<Vec<ScanReport>>, ApiError> {
    if reports.is_empty() { Err(ApiError::NotFound) } else { Ok(Json(reports)) }
}

async fn list_scans<S: ScanStore + Send + 'static>(
    State(svc): State<Shared<S>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ScanReport>>, ApiError> {
    let max_results = match params.max_results.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<u32>().map_err(|_| ApiError::BadMaxResults(raw.to_string()))?),
    };
    found(blocking(svc, move |svc| svc.lookup(&ScanQuery::latest(max_results))).await?)
}

async fn scans_by_ip<S: ScanStore + Send + 'static>(
    State(svc): State<Shared<S>>,
    Path(host_ip): Path<String>,
) -> Result<Json<Vec<ScanReport>>, ApiError> {
    found(blocking(svc, move |svc| svc.lookup(&ScanQuery::host(host_ip))).await?)
}

async fn scans_by_uid<S: ScanStore + Send + 'static>(
    State(svc): State<Shared<S>>,
    Path(uid): Path<String>,
) -> Result<Json<Vec<ScanReport>>, ApiError> {
    found(blocking(svc, move |svc| svc.lookup(&ScanQuery::scan(uid))).await?)
}

pub fn router<S: ScanStore + Send + 'static>(service: Shared<S>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/upload", post(upload::<S>))
        .route("/api/scans", get(list_scans::<S>))
        .route("/api/scans/ip/:host_ip", get(scans_by_ip::<S>))
        .route("/api/scans/uid/:uid", get(scans_by_uid::<S>))
        .with_state(service)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

pub async fn serve<S: ScanStore + Send + 'static>(service: Shared<S>, bind: &str, max_body_bytes: usize) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(addr = %listener.local_addr()?, "scanvault listening");
    axum::serve(listener, router(service, max_body_bytes)).await?;
    Ok(())
}
