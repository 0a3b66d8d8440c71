//! Server test utilities.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use camino::Utf8PathBuf;
use mapvault_core::OwnerId;
use mapvault_server::{AppState, ServerConfig, create_router, issue_token, open_state};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Upload ceiling used by test servers.
pub const TEST_MAX_UPLOAD_BYTES: usize = 1024;

const BOUNDARY: &str = "mapvault-test-boundary";

/// A test server over a temporary data directory.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a server with the default retrieval policy.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a server after adjusting its configuration.
    pub fn with_config(modifier: impl FnOnce(&mut ServerConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let data_dir = Utf8PathBuf::from_path_buf(temp_dir.path().join("data"))
            .expect("temp directory should be UTF-8");
        let mut config = ServerConfig::for_data_dir(data_dir);
        config.max_upload_bytes = TEST_MAX_UPLOAD_BYTES;
        modifier(&mut config);

        let state = open_state(&config).expect("Failed to open state");
        let router = create_router(state.clone());
        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Issue a bearer token for `owner`.
    pub fn token_for(&self, owner: &str) -> String {
        let owner = OwnerId::new(owner).expect("valid owner");
        issue_token(self.state.credentials.as_ref(), &owner).expect("Failed to issue token")
    }

    /// Send a request and return the status and raw body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        (status, content_type, body.to_vec())
    }

    /// Send a JSON request and decode the JSON response.
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).expect("serialise body"))
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("request");
        let (status, _, bytes) = self.send(request).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Upload `bytes` as `file_name` through the multipart endpoint.
    pub async fn upload(&self, file_name: &str, bytes: &[u8], token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body("file", file_name, bytes)))
            .expect("request");
        let (status, _, body) = self.send(request).await;
        (
            status,
            serde_json::from_slice(&body).unwrap_or(Value::Null),
        )
    }
}

/// Encode a single-part multipart form.
pub fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Multipart content type matching [`multipart_body`].
#[allow(dead_code)]
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}
