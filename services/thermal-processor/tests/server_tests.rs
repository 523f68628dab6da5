//! Tests for the thermal processor HTTP endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use ingestion::{AnalysisOutcome, DatasetId, NpyArray, REQUIRED_FILES, RESULT_FILE};
use serde_json::Value;
use tempfile::TempDir;
use test_utils::{wait_until, DatasetFixture};
use thermal_processor::{build_router, scan_existing, AppState, ServiceConfig};
use tower::ServiceExt;

struct Harness {
    data: TempDir,
    output: TempDir,
    state: Arc<AppState>,
    router: Router,
}

impl Harness {
    fn new() -> Self {
        let data = tempfile::tempdir().expect("Failed to create temp dir");
        let output = tempfile::tempdir().expect("Failed to create temp dir");
        let mut config = ServiceConfig {
            data_dir: data.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
            ..Default::default()
        };
        config.processor.chunk_size = 1;
        config.processor.worker_threads = 2;

        let state = Arc::new(AppState::from_config(&config).expect("build state"));
        let router = build_router(Arc::clone(&state));
        Self {
            data,
            output,
            state,
            router,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("request failed");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn post_arrival(&self, body: Value) -> (StatusCode, Value) {
        let request = Request::post("/arrivals")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn wait_for_outcome(&self, id: &str) -> Option<AnalysisOutcome> {
        let registry = Arc::clone(self.state.coordinator.registry());
        let id = DatasetId::from(id);
        let probe = id.clone();
        let probe_registry = Arc::clone(&registry);
        wait_until(Duration::from_secs(30), move || {
            probe_registry
                .status(&probe)
                .is_some_and(|s| s.outcome.is_some())
        })
        .await;
        registry.status(&id).and_then(|s| s.outcome)
    }
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let harness = Harness::new();
    let (status, body) = harness.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "thermal-processor");
    assert_eq!(body["tracked_datasets"], 0);
}

// ============================================================================
// Arrivals
// ============================================================================

#[tokio::test]
async fn test_arrivals_gate_then_analyze() {
    let harness = Harness::new();
    DatasetFixture::uniform(2, 2, 16, |_, _| 1300.0)
        .write_into(harness.data.path(), "capture_01")
        .expect("write dataset");

    for name in &REQUIRED_FILES[..8] {
        let (status, body) = harness
            .post_arrival(serde_json::json!({ "dataset_id": "capture_01", "file_name": name }))
            .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["decision"], "waiting");
        assert!(body["request_id"].is_string());
    }

    let (status, body) = harness
        .post_arrival(serde_json::json!({
            "relative_path": format!("capture_01/{}", REQUIRED_FILES[8])
        }))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["decision"], "triggered");

    assert_eq!(
        harness.wait_for_outcome("capture_01").await,
        Some(AnalysisOutcome::Succeeded)
    );

    let bytes = std::fs::read(harness.output.path().join("capture_01").join(RESULT_FILE))
        .expect("result written");
    let array = NpyArray::parse(&bytes).expect("valid npy");
    assert_eq!(array.shape, (2, 2));
    for value in array.values {
        assert!((value - 1300.0).abs() < 13.0, "got {}", value);
    }

    // Redelivery is acknowledged but does not retrigger.
    let (_, body) = harness
        .post_arrival(serde_json::json!({ "relative_path": "capture_01/raw" }))
        .await;
    assert_eq!(body["decision"], "already_analyzed");
}

#[tokio::test]
async fn test_unrelated_file_is_ignored() {
    let harness = Harness::new();
    let (status, body) = harness
        .post_arrival(serde_json::json!({ "relative_path": "capture_01/preview.png" }))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["decision"], "ignored");

    let (_, body) = harness.get("/datasets").await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_bad_paths_are_rejected() {
    let harness = Harness::new();

    let (status, body) = harness
        .post_arrival(serde_json::json!({ "relative_path": "raw.hdr" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = harness
        .post_arrival(serde_json::json!({ "dataset_id": "../outside", "file_name": "raw" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Dataset status
// ============================================================================

#[tokio::test]
async fn test_dataset_status() {
    let harness = Harness::new();
    harness
        .post_arrival(serde_json::json!({ "relative_path": "day_2/capture_05/raw.hdr" }))
        .await;

    let (status, body) = harness.get("/datasets").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["datasets"][0]["dataset_id"], "day_2/capture_05");

    let (status, body) = harness.get("/datasets/day_2/capture_05").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "incomplete");
    assert_eq!(body["received"], serde_json::json!(["raw.hdr"]));
    assert_eq!(body["missing"].as_array().unwrap().len(), 8);

    let (status, body) = harness.get("/datasets/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("unknown"));
}

// ============================================================================
// Startup scan
// ============================================================================

#[tokio::test]
async fn test_scan_existing_analyzes_complete_captures() {
    let harness = Harness::new();
    DatasetFixture::uniform(1, 1, 8, |_, _| 1500.0)
        .write_into(harness.data.path(), "capture_complete")
        .expect("write dataset");
    let partial = DatasetFixture::uniform(1, 1, 8, |_, _| 1500.0)
        .write_into(harness.data.path(), "capture_partial")
        .expect("write dataset");
    std::fs::remove_file(partial.join("darkReference")).unwrap();
    std::fs::write(harness.data.path().join("stray.txt"), "not a capture").unwrap();

    let report = scan_existing(&harness.state.coordinator, harness.data.path()).await;

    assert_eq!(report.datasets_seen, 2);
    assert_eq!(report.files_seen, 17);
    assert_eq!(report.triggered, vec![DatasetId::from("capture_complete")]);
    assert!(harness
        .output
        .path()
        .join("capture_complete")
        .join(RESULT_FILE)
        .exists());

    let (_, body) = harness.get("/datasets/capture_partial").await;
    assert_eq!(body["missing"], serde_json::json!(["darkReference"]));
}
