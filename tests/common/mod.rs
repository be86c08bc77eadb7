//! Common test fixtures for the sync and download integration tests
//!
//! Runs a small in-process HTTP server that plays the part of the remote
//! package repository: files are registered in memory, every request is
//! counted, and individual paths can be made to stall, trickle or fail so
//! the engine's retry and cancellation behavior can be observed.

#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use model_sync::SyncConfig;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

/// Opt-in log output for debugging test runs:
/// `RUST_LOG=model_sync=debug cargo test`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Clone, Default)]
struct ServerState {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    stalled: Arc<Mutex<HashSet<String>>>,
    trickled: Arc<Mutex<HashSet<String>>>,
    /// Remaining 500 responses per path before it starts serving.
    failures: Arc<Mutex<HashMap<String, usize>>>,
}

/// In-process stand-in for the remote package repository.
pub struct FixtureServer {
    addr: SocketAddr,
    state: ServerState,
    server: tokio::task::JoinHandle<()>,
}

impl FixtureServer {
    pub async fn start() -> Self {
        let state = ServerState::default();
        let app = Router::new()
            .route("/{*path}", get(serve_path))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fixture server");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Fixture server crashed");
        });

        Self { addr, state, server }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Register a file at `path` (no leading slash).
    pub fn put_file(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.state
            .files
            .lock()
            .unwrap()
            .insert(path.trim_start_matches('/').to_string(), bytes.into());
    }

    /// Register a complete model package: every file plus a matching
    /// `files.json`. Rows are (filename, dir, contents); the manifest keeps
    /// `dir` exactly as given while files are stored under the normalized
    /// path, mirroring how repositories with Windows-authored manifests
    /// actually serve their content.
    pub fn put_model_package(&self, ai_dir: &str, model: &str, files: &[(&str, &str, &[u8])]) {
        let mut rows = Vec::new();
        for (filename, dir, contents) in files {
            let crc = format!("{:08x}", crc32fast::hash(contents));
            let suffix = remote_suffix(filename, dir);
            self.put_file(&format!("{ai_dir}/{model}/{suffix}"), contents.to_vec());
            rows.push(serde_json::json!({
                "filename": filename,
                "dir": dir,
                "size": contents.len().to_string(),
                "crc32": crc,
            }));
        }
        self.put_file(
            &format!("{ai_dir}/{model}/files.json"),
            serde_json::to_vec_pretty(&rows).expect("Failed to encode manifest"),
        );
    }

    /// Requests seen for `path` so far.
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .get(path.trim_start_matches('/'))
            .copied()
            .unwrap_or(0)
    }

    /// Requests seen across all paths.
    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().unwrap().values().sum()
    }

    pub fn reset_hits(&self) {
        self.state.hits.lock().unwrap().clear();
    }

    /// Send headers for `path` but never any body bytes.
    pub fn stall_on(&self, path: &str) {
        self.state
            .stalled
            .lock()
            .unwrap()
            .insert(path.trim_start_matches('/').to_string());
    }

    /// Serve `path` one byte every 20ms, without a Content-Length.
    pub fn trickle_on(&self, path: &str) {
        self.state
            .trickled
            .lock()
            .unwrap()
            .insert(path.trim_start_matches('/').to_string());
    }

    /// Respond 500 to the next `times` requests for `path`, then serve it.
    pub fn fail_times(&self, path: &str, times: usize) {
        self.state
            .failures
            .lock()
            .unwrap()
            .insert(path.trim_start_matches('/').to_string(), times);
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn serve_path(State(state): State<ServerState>, Path(path): Path<String>) -> Response {
    let key = path.trim_start_matches('/').to_string();
    *state.hits.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

    {
        let mut failures = state.failures.lock().unwrap();
        if let Some(remaining) = failures.get_mut(&key)
            && *remaining > 0
        {
            *remaining -= 1;
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    if state.stalled.lock().unwrap().contains(&key) {
        let pending = futures::stream::pending::<Result<Bytes, std::io::Error>>();
        return Body::from_stream(pending).into_response();
    }

    let bytes = match state.files.lock().unwrap().get(&key) {
        Some(bytes) => bytes.clone(),
        None => return StatusCode::NOT_FOUND.into_response(),
    };

    if state.trickled.lock().unwrap().contains(&key) {
        let stream = async_stream::stream! {
            for byte in bytes {
                tokio::time::sleep(Duration::from_millis(20)).await;
                yield Ok::<Bytes, std::io::Error>(Bytes::copy_from_slice(&[byte]));
            }
        };
        return Body::from_stream(stream).into_response();
    }

    bytes.into_response()
}

fn remote_suffix(filename: &str, dir: &str) -> String {
    let dir = dir.replace('\\', "/");
    let dir = dir.strip_prefix('/').unwrap_or(&dir);
    if dir.is_empty() {
        filename.to_string()
    } else {
        format!("{dir}/{filename}")
    }
}

/// Config pointed at the fixture server, tuned so failing paths resolve in
/// milliseconds instead of the production six-second stall window.
pub fn test_config(server: &FixtureServer, package_root: &std::path::Path) -> SyncConfig {
    SyncConfig {
        base_url: server.base_url(),
        package_root: package_root.to_path_buf(),
        max_retries: 3,
        stall_timeout_ms: 250,
        cancel_poll_interval_ms: 25,
        progress_log_interval_ms: 50,
        ..Default::default()
    }
}
