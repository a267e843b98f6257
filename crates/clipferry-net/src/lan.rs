//! Embedded LAN server
//!
//! Serves pending outbound envelopes to co-local peers and accepts
//! direct uploads from them. Bound to `0.0.0.0` on a random port in
//! `[50000, 60000)` picked once at startup.
//!
//! Routes:
//! - `GET /probe` — reachability check the signaling server performs
//! - `GET /ping` — client-side liveness
//! - `GET /files/{name}` — a published blob; requires `X-Room-ID`
//! - `POST /upload` — peer push path; requires `X-Room-ID`
//!
//! The room id is weak authentication by design: the payloads served are
//! AEAD envelopes, so possession of the id alone yields ciphertext only.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use clipferry_protocol::filename;

use crate::{NetworkError, Result};

/// Lower bound of the port window (inclusive)
const PORT_MIN: u16 = 50_000;

/// Upper bound of the port window (exclusive)
const PORT_MAX: u16 = 60_000;

/// Attempts before giving up on finding a free port
const BIND_ATTEMPTS: u32 = 32;

/// Where `/files/{name}` looks for blobs and where uploads land
#[derive(Debug, Clone)]
pub struct LanPaths {
    /// Receive directory, checked first
    pub download_dir: PathBuf,
    /// Pending-transfer directory, checked second
    pub temp_dir: PathBuf,
}

/// A file a peer pushed to us via `POST /upload`
#[derive(Debug, Clone)]
pub struct LanUpload {
    pub filename: String,
    pub kind: String,
    pub bytes: Vec<u8>,
}

/// Shared state behind the router
pub struct LanState {
    /// Current room id; replaced when credentials regenerate
    pub room_id: RwLock<String>,
    pub paths: LanPaths,
    /// Receive pipeline; uploads are handed over for saving + delivery
    pub inbound: tokio::sync::mpsc::Sender<LanUpload>,
}

impl LanState {
    /// Swap the expected room id (credential regeneration)
    pub fn set_room_id(&self, room_id: String) {
        *self.room_id.write().expect("room id lock poisoned") = room_id;
    }

    fn room_id_matches(&self, headers: &HeaderMap) -> bool {
        let expected = self.room_id.read().expect("room id lock poisoned");
        headers
            .get("x-room-id")
            .and_then(|v| v.to_str().ok())
            .map(|got| got == expected.as_str())
            .unwrap_or(false)
    }
}

/// Running LAN server handle
pub struct LanServer {
    pub port: u16,
    pub state: Arc<LanState>,
    cancel: CancellationToken,
}

impl LanServer {
    /// Bind a random port in the window and start serving
    pub async fn spawn(state: Arc<LanState>) -> Result<Self> {
        let (listener, port) = bind_random_port().await?;
        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let app = router(Arc::clone(&state));

        info!(port, "LAN server listening");
        tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = result {
                warn!("LAN server exited with error: {}", e);
            }
        });

        Ok(Self {
            port,
            state,
            cancel,
        })
    }

    /// Stop accepting connections
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn bind_random_port() -> Result<(TcpListener, u16)> {
    use rand::Rng;

    for _ in 0..BIND_ATTEMPTS {
        let port = rand::thread_rng().gen_range(PORT_MIN..PORT_MAX);
        match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(_) => continue,
        }
    }
    Err(NetworkError::NoFreePort(format!(
        "{}..{}",
        PORT_MIN, PORT_MAX
    )))
}

/// Build the LAN router
pub fn router(state: Arc<LanState>) -> Router {
    Router::new()
        .route("/probe", get(|| async { "ok" }))
        .route("/ping", get(|| async { "pong" }))
        .route("/files/{name}", get(get_file))
        .route("/upload", post(upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_file(
    State(state): State<Arc<LanState>>,
    UrlPath(name): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    if !state.room_id_matches(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let name = match filename::sanitize(&name) {
        Ok(name) => name,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    // Download dir first, pending-transfer dir second
    let mut path = state.paths.download_dir.join(name);
    if !path.is_file() {
        path = state.paths.temp_dir.join(name);
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn upload(
    State(state): State<Arc<LanState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !state.room_id_matches(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let name = match filename::sanitize(&raw_name) {
            Ok(name) => name.to_string(),
            Err(_) => return StatusCode::BAD_REQUEST.into_response(),
        };
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                warn!("upload body read failed: {}", e);
                return StatusCode::BAD_REQUEST.into_response();
            }
        };

        info!(filename = %name, size = bytes.len(), "LAN upload received");
        let upload = LanUpload {
            kind: detect_kind(&name),
            filename: name,
            bytes,
        };
        if state.inbound.send(upload).await.is_err() {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
        return (StatusCode::OK, "OK").into_response();
    }

    StatusCode::BAD_REQUEST.into_response()
}

/// Content kind from the filename extension
pub fn detect_kind(name: &str) -> String {
    let ext = name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "bmp" => "image".to_string(),
        _ => "file".to_string(),
    }
}
