// src/reload/server.rs

//! Development HTTP server with live reload.
//!
//! Serves files from the profile's route and base directories, injects the
//! reload client into HTML pages and forwards [`ReloadMessage`]s to every
//! connected WebSocket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ReloadHub, ReloadMessage};

pub const CLIENT_SCRIPT_PATH: &str = "/__assetflow/livereload.js";
pub const SOCKET_PATH: &str = "/__assetflow/ws";

const CLIENT_SCRIPT: &str = include_str!("client.js");

/// What and where to serve.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: IpAddr,
    /// `0` picks a free port.
    pub port: u16,
    /// Project root; directories below are resolved against it.
    pub root: PathBuf,
    /// Searched in order for every request not matched by a route.
    pub base_dirs: Vec<PathBuf>,
    /// URL prefix -> directory, e.g. `/node_modules` -> `node_modules`.
    pub routes: Vec<(String, PathBuf)>,
}

impl ServerOptions {
    pub fn new(root: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            root: root.into(),
            base_dirs: Vec::new(),
            routes: Vec::new(),
        }
    }
}

struct ServerState {
    options: ServerOptions,
    hub: ReloadHub,
}

/// Running server. Dropping it without [`ServerHandle::shutdown`] leaves the
/// server running until the process exits.
#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting connections and wait for the server task.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(err) = self.task.await {
            warn!(error = %err, "reload server task failed");
        }
        info!("reload server stopped");
    }
}

pub fn router(options: ServerOptions, hub: ReloadHub) -> Router {
    let mut options = options;
    // Longest prefix wins.
    options
        .routes
        .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));

    let state = Arc::new(ServerState { options, hub });

    Router::new()
        .route(CLIENT_SCRIPT_PATH, get(client_script))
        .route(SOCKET_PATH, get(ws_handler))
        .fallback(static_handler)
        .with_state(state)
}

/// Bind and serve in a background task.
pub async fn start_server(options: ServerOptions, hub: ReloadHub) -> Result<ServerHandle> {
    let bind = SocketAddr::new(options.host, options.port);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding reload server to {bind}"))?;
    let addr = listener.local_addr()?;

    let app = router(options, hub);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(err) = result {
            warn!(error = %err, "reload server error");
        }
    });

    info!("serving at http://{addr}");

    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

async fn ws_handler(
    State(state): State<Arc<ServerState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = state.hub.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(mut socket: WebSocket, mut rx: broadcast::Receiver<ReloadMessage>) {
    debug!("reload client connected");
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(msg) => {
                        let Ok(json) = serde_json::to_string(&msg) else {
                            continue;
                        };
                        if socket.send(Message::Text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(Message::Ping(data))) => {
                        let _ = socket.send(Message::Pong(data)).await;
                    }
                    _ => {}
                }
            }
        }
    }
    debug!("reload client disconnected");
}

async fn static_handler(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    // Paths that do not decode to UTF-8 cannot name a file we serve.
    let Ok(decoded) = urlencoding::decode(uri.path()) else {
        debug!(path = %uri.path(), "undecodable request path");
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };
    let request_path = decoded.as_ref();

    let Some(file) = resolve_request(&state.options, request_path).await else {
        debug!(path = %request_path, "not found");
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    let bytes = match tokio::fs::read(&file).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(file = ?file, error = %err, "failed to read served file");
            return (StatusCode::INTERNAL_SERVER_ERROR, "read error").into_response();
        }
    };

    let mime = mime_for(&file);
    let body = if mime.starts_with("text/html") {
        inject_client(&String::from_utf8_lossy(&bytes)).into_bytes()
    } else {
        bytes
    };

    ([(header::CONTENT_TYPE, mime)], body).into_response()
}

/// Map a URL path to a file: routes first, then base directories in order.
/// Directory requests serve `index.html`.
async fn resolve_request(options: &ServerOptions, request_path: &str) -> Option<PathBuf> {
    let rel = sanitize(request_path)?;

    let mut candidates: Vec<PathBuf> = Vec::new();
    for (prefix, dir) in options.routes.iter() {
        if let Some(rest) = strip_route(request_path, prefix) {
            let rest = sanitize(rest)?;
            candidates.push(options.root.join(dir).join(rest));
        }
    }
    for base in options.base_dirs.iter() {
        candidates.push(options.root.join(base).join(&rel));
    }

    for candidate in candidates {
        let candidate = match tokio::fs::metadata(&candidate).await {
            Ok(meta) if meta.is_dir() => candidate.join("index.html"),
            Ok(_) => candidate,
            Err(_) => continue,
        };
        if tokio::fs::metadata(&candidate)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            return Some(candidate);
        }
    }
    None
}

fn strip_route<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// URL path to a relative filesystem path. Rejects `..`.
fn sanitize(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    let rel = Path::new(trimmed);
    let mut out = PathBuf::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(out)
}

/// Insert the reload client before `</body>`, or append it.
pub fn inject_client(html: &str) -> String {
    let tag = format!("<script src=\"{CLIENT_SCRIPT_PATH}\"></script>");
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..idx]);
            out.push_str(&tag);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
