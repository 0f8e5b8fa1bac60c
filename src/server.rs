//! Development HTTP server.
//!
//! Serves the output directory as static files, injects a small live-reload
//! client into HTML responses, and exposes `/__reload` as a long-poll
//! endpoint the client waits on: the request parks until a reload signal is
//! broadcast, the client then refreshes the page and reconnects. No
//! authentication, no routing beyond static files.

use crate::reload::Reloader;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::io;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tower_http::trace::TraceLayer;

/// Live-reload client injected into served HTML pages.
const RELOAD_SCRIPT: &str = concat!(
    "<script>(async()=>{for(;;){try{",
    "const r=await fetch('/__reload');",
    "if(r.ok){location.reload();return;}",
    "}catch(_){}",
    "await new Promise(d=>setTimeout(d,1000));",
    "}})();</script>"
);

/// Dev server error
#[derive(Debug, Error)]
pub enum ServeError {
    /// Could not bind the listen address
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    /// Server I/O error after startup
    #[error("server error: {0}")]
    Io(#[from] io::Error),
}

/// Dev server settings resolved from config.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Directory to serve
    pub root: PathBuf,
    /// Port on localhost
    pub port: u16,
    /// Path served for `/`
    pub start_path: String,
    /// Inject the live-reload client into HTML
    pub notify: bool,
}

/// Shared state for the request handlers.
#[derive(Clone)]
struct AppState {
    options: ServerOptions,
    reloader: Reloader,
}

/// Build the router. Split out from [`serve`] so tests can drive it without
/// binding a socket.
pub fn router(options: ServerOptions, reloader: Reloader) -> Router {
    let state = AppState { options, reloader };
    Router::new()
        .route("/__reload", get(reload_poll))
        .fallback(get(serve_static))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and run the server until the task is cancelled.
pub async fn serve(options: ServerOptions, reloader: Reloader) -> Result<(), ServeError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], options.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServeError::Bind { addr, source })?;

    tracing::info!("serving {} at http://{}/", options.root.display(), addr);
    let app = router(options, reloader);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Long-poll handler: parks until a reload signal arrives. A lagged
/// receiver still means "something was rebuilt", so it reloads too.
async fn reload_poll(State(state): State<AppState>) -> Response {
    let mut rx = state.reloader.subscribe();
    match rx.recv().await {
        Ok(signal) => (StatusCode::OK, signal.kind.to_string()).into_response(),
        Err(RecvError::Lagged(_)) => (StatusCode::OK, "reload").into_response(),
        Err(RecvError::Closed) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn serve_static(State(state): State<AppState>, uri: Uri) -> Response {
    let requested = uri.path().trim_start_matches('/');
    let requested = if requested.is_empty() { state.options.start_path.as_str() } else { requested };

    let Some(relative) = sanitize(requested) else {
        return (StatusCode::BAD_REQUEST, "invalid path").into_response();
    };

    let mut full = state.options.root.join(relative);
    if full.is_dir() {
        full = full.join("index.html");
    }

    let bytes = match tokio::fs::read(&full).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return (StatusCode::NOT_FOUND, "not found").into_response();
        }
        Err(e) => {
            tracing::error!("failed to read {}: {}", full.display(), e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mime = content_type(&full);
    if state.options.notify && mime == "text/html" {
        let html = String::from_utf8_lossy(&bytes);
        let injected = inject_reload_script(&html);
        return ([(header::CONTENT_TYPE, mime)], injected).into_response();
    }
    ([(header::CONTENT_TYPE, mime)], bytes).into_response()
}

/// Reject traversal and absolute components; return a safe relative path.
fn sanitize(requested: &str) -> Option<PathBuf> {
    let path = Path::new(requested);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(clean)
}

/// Content type by file extension. Unknown extensions are served as bytes.
fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("map") | Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Insert the reload client before `</body>`, or append when the page has
/// no closing body tag.
fn inject_reload_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + RELOAD_SCRIPT.len());
            out.push_str(&html[..pos]);
            out.push_str(RELOAD_SCRIPT);
            out.push_str(&html[pos..]);
            out
        }
        None => {
            let mut out = html.to_string();
            out.push_str(RELOAD_SCRIPT);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::AssetKind;
    use axum::body::Body;
    use axum::http::Request;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn options(root: &Path) -> ServerOptions {
        ServerOptions {
            root: root.to_path_buf(),
            port: 0,
            start_path: "index.html".to_string(),
            notify: true,
        }
    }

    async fn get_path(app: Router, path: &str) -> (StatusCode, String) {
        let response =
            app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_serves_start_path_with_injection() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("index.html"), "<html><body>hi</body></html>").unwrap();
        let app = router(options(temp.path()), Reloader::new());

        let (status, body) = get_path(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("hi"));
        assert!(body.contains("/__reload"));
        assert!(body.find("__reload").unwrap() < body.find("</body>").unwrap());
    }

    #[tokio::test]
    async fn test_serves_css_without_injection() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("css")).unwrap();
        fs::write(temp.path().join("css/main.css"), "body{margin:0}").unwrap();
        let app = router(options(temp.path()), Reloader::new());

        let (status, body) = get_path(app, "/css/main.css").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "body{margin:0}");
    }

    #[tokio::test]
    async fn test_missing_file_404() {
        let temp = TempDir::new().unwrap();
        let app = router(options(temp.path()), Reloader::new());
        let (status, _) = get_path(app, "/nope.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let temp = TempDir::new().unwrap();
        let app = router(options(temp.path()), Reloader::new());
        let (status, _) = get_path(app, "/../secret").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_reload_poll_returns_on_broadcast() {
        let temp = TempDir::new().unwrap();
        let reloader = Reloader::new();
        let app = router(options(temp.path()), reloader.clone());

        let request = tokio::spawn(async move { get_path(app, "/__reload").await });
        // Give the handler time to subscribe before broadcasting.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        reloader.broadcast(AssetKind::Styles);

        let (status, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "styles");
    }

    #[test]
    fn test_inject_without_body_tag() {
        let injected = inject_reload_script("plain");
        assert!(injected.starts_with("plain"));
        assert!(injected.contains("<script>"));
    }

    #[test]
    fn test_content_type_map() {
        assert_eq!(content_type(Path::new("a.html")), "text/html");
        assert_eq!(content_type(Path::new("a.min.css")), "text/css");
        assert_eq!(content_type(Path::new("a.webp")), "image/webp");
        assert_eq!(content_type(Path::new("a.bin")), "application/octet-stream");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("css/a.css"), Some(PathBuf::from("css/a.css")));
        assert_eq!(sanitize("./a.html"), Some(PathBuf::from("a.html")));
        assert_eq!(sanitize("../etc/passwd"), None);
    }
}
