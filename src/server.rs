use crate::config::PreviewConfig;
use crate::data;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

pub const CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, proxy-revalidate, max-age=0";
pub const CONTENT_SECURITY_POLICY: &str = "frame-ancestors 'self'";

/// Stripped from every response.
const REMOVED_HEADERS: [&str; 3] = ["x-xss-protection", "x-frame-options", "expires"];

pub struct PreviewState {
    pub root: PathBuf,
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("jsx") => "text/jsx; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Removes every `../` and `..\` (repeatedly, so `....//` cannot reassemble one)
/// and any leading separators.
pub fn sanitize_path(raw: &str) -> String {
    let mut path = raw.to_string();
    while path.contains("../") || path.contains("..\\") {
        path = path.replace("../", "").replace("..\\", "");
    }
    path.trim_start_matches(['/', '\\']).to_string()
}

/// Decodes `%XX` escapes. `None` for a truncated escape or bytes that are not UTF-8.
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = (*bytes.get(i + 1)? as char).to_digit(16)?;
            let lo = (*bytes.get(i + 2)? as char).to_digit(16)?;
            out.push((hi * 16 + lo) as u8);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// The file to serve for a request path, falling back to `index.html`.
pub fn resolve(root: &Path, raw: &str) -> PathBuf {
    let index = root.join("index.html");
    let relative = PathBuf::from(sanitize_path(raw));
    if !relative.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
        return index;
    }
    let candidate = root.join(relative);
    if candidate.is_file() {
        candidate
    } else {
        index
    }
}

async fn serve_file(path: PathBuf) -> Response {
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, content_type(&path))],
            Body::from(bytes),
        )
            .into_response(),
        Err(e) => {
            error!("failed to read {:?}: {}", path, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn serve_root(State(state): State<Arc<PreviewState>>) -> Response {
    serve_file(resolve(&state.root, "")).await
}

async fn serve_path(State(state): State<Arc<PreviewState>>, uri: Uri) -> Response {
    let path = match percent_decode(uri.path()) {
        Some(path) => resolve(&state.root, &path),
        None => {
            debug!("undecodable request path {:?}", uri.path());
            state.root.join("index.html")
        }
    };
    serve_file(path).await
}

async fn apply_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CONTENT_SECURITY_POLICY),
    );
    for name in REMOVED_HEADERS {
        headers.remove(HeaderName::from_static(name));
    }
    response
}

pub fn router(root: PathBuf) -> Router {
    let state = Arc::new(PreviewState { root });
    Router::new()
        .route("/", get(serve_root))
        .route("/*path", get(serve_path))
        .layer(middleware::map_response(apply_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(config: &PreviewConfig) -> Result<()> {
    data::require_dir("preview root (run the web build first)", &config.root)?;
    let root = config
        .root
        .canonicalize()
        .with_context(|| format!("Failed to resolve preview root: {:?}", config.root))?;

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Preview server running at http://localhost:{} serving {:?}", config.port, root);

    let app = router(root);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
