//! Common test utilities for API testing with a mock engine.
//!
//! This module provides a test fixture that creates an in-process server
//! with a [`MockEngine`] injected, so the whole session flow can be driven
//! over HTTP without an ffmpeg binary.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use ffmfy_core::testing::MockEngine;
use ffmfy_core::{
    AdmissionConstraints, Config, ConversionEngine, ConversionOrchestrator, OrchestratorConfig,
};
use ffmfy_server::state::{AppState, SharedOrchestrator};

/// Multipart boundary used by the upload helpers.
pub const BOUNDARY: &str = "ffmfy-test-boundary";

/// Test fixture for API testing with a mock engine.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.upload("song.wav", "audio/wav", &[1, 2, 3]).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock engine - control progress, output and failures
    pub engine: Arc<MockEngine>,
    /// The orchestrator behind the router
    pub orchestrator: SharedOrchestrator,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Raw response, for non-JSON bodies
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Load the mock engine before the router is built
    pub load_engine: bool,
    /// Admission constraints for uploads
    pub admission: AdmissionConstraints,
    /// Request body limit for uploads, when not the default
    pub max_upload_bytes: Option<usize>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            load_engine: true,
            admission: AdmissionConstraints::default(),
            max_upload_bytes: None,
        }
    }
}

impl TestConfig {
    /// Create config with the engine left unloaded.
    pub fn without_engine() -> Self {
        Self {
            load_engine: false,
            ..Default::default()
        }
    }

    /// Create config with a request body limit for uploads.
    pub fn with_body_limit(bytes: usize) -> Self {
        Self {
            max_upload_bytes: Some(bytes),
            ..Default::default()
        }
    }

    /// Create config with a maximum upload size.
    pub fn with_max_size(bytes: u64) -> Self {
        Self {
            admission: AdmissionConstraints::default().with_max_size(bytes),
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with a loaded mock engine.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let engine = Arc::new(MockEngine::new());
        if test_config.load_engine {
            engine.load().await.expect("Failed to load mock engine");
        }

        let mut config = Config {
            session: OrchestratorConfig::default().with_admission(test_config.admission),
            ..Default::default()
        };
        if let Some(bytes) = test_config.max_upload_bytes {
            config.server.max_upload_bytes = bytes;
        }

        let orchestrator: SharedOrchestrator = Arc::new(
            ConversionOrchestrator::new(
                Arc::clone(&engine) as Arc<dyn ConversionEngine>,
                config.session.clone(),
            )
            .with_classifier(config.formats.classifier()),
        );

        let state = Arc::new(AppState::new(config, Arc::clone(&orchestrator)));
        let router = ffmfy_server::api::create_router(state);

        Self {
            router,
            engine,
            orchestrator,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request without body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Upload a file as the `file` field of a multipart form.
    pub async fn upload(&self, file_name: &str, content_type: &str, data: &[u8]) -> TestResponse {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        self.send_multipart(body).await
    }

    /// Send a multipart form with a single text field and no file.
    pub async fn upload_without_file(&self) -> TestResponse {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        self.send_multipart(body.into_bytes()).await
    }

    /// Send a GET request and keep the raw body and headers.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        RawResponse {
            status,
            headers,
            body,
        }
    }

    /// Poll the session until it reaches `state`, returning the snapshot.
    pub async fn wait_for_state(&self, state: &str) -> Value {
        let mut last = Value::Null;
        for _ in 0..200 {
            let response = self.get("/api/v1/session").await;
            if response.body["state"] == state {
                return response.body;
            }
            last = response.body;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Session never reached {}; last snapshot: {}", state, last);
    }

    /// Send a raw multipart body to the upload endpoint.
    pub async fn send_multipart(&self, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/session/input")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
