//! HTTP server for the thermal processor.
//!
//! Provides endpoints for:
//! - `POST /arrivals` - Announce a file that landed in the data directory
//! - `GET /datasets` - Completeness and outcome of every tracked dataset
//! - `GET /datasets/*id` - One dataset
//! - `GET /health` - Health check

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use ingestion::{parse_dataset_path, validate_dataset_id, ArrivalDecision, DatasetId, DatasetStatus};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Request body for `/arrivals`.
///
/// Either names the dataset and file explicitly or gives the path relative
/// to the data directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ArrivalRequest {
    Explicit { dataset_id: String, file_name: String },
    Path { relative_path: String },
}

impl ArrivalRequest {
    pub fn resolve(&self) -> ingestion::Result<(DatasetId, String)> {
        match self {
            Self::Explicit {
                dataset_id,
                file_name,
            } => {
                validate_dataset_id(dataset_id)?;
                Ok((DatasetId::new(dataset_id.as_str()), file_name.clone()))
            }
            Self::Path { relative_path } => parse_dataset_path(relative_path),
        }
    }
}

/// Response body for `/arrivals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrivalResponse {
    pub request_id: String,
    pub dataset_id: DatasetId,
    pub file_name: String,
    #[serde(flatten)]
    pub decision: ArrivalDecision,
}

/// Response body for `/datasets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetsResponse {
    pub count: usize,
    pub datasets: Vec<DatasetStatus>,
}

/// Body of every 4xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub tracked_datasets: usize,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// POST /arrivals - Record a file arrival
async fn arrival_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ArrivalRequest>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let (dataset_id, file_name) = match request.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(id = %request_id, error = %e, "Rejected arrival");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let decision = state.coordinator.dispatch(&dataset_id, &file_name);
    info!(
        id = %request_id,
        dataset = %dataset_id,
        file = %file_name,
        decision = ?decision,
        "Recorded arrival"
    );

    (
        StatusCode::ACCEPTED,
        Json(ArrivalResponse {
            request_id,
            dataset_id,
            file_name,
            decision,
        }),
    )
        .into_response()
}

/// GET /datasets - All tracked datasets
async fn datasets_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let datasets = state.coordinator.registry().snapshot();
    Json(DatasetsResponse {
        count: datasets.len(),
        datasets,
    })
}

/// GET /datasets/*id - One dataset
async fn dataset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id = DatasetId::new(id.trim_start_matches('/'));
    match state.coordinator.registry().status(&id) {
        Some(status) => Json(status).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("unknown dataset '{}'", id)),
    }
}

/// GET /health - Health check
async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "thermal-processor".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at: state.started_at,
        tracked_datasets: state.coordinator.registry().len(),
    })
}

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/arrivals", post(arrival_handler))
        .route("/datasets", get(datasets_handler))
        .route("/datasets/*id", get(dataset_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

/// Start the HTTP server.
pub async fn start_server(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, "Starting thermal processor HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
