mod config;
mod ingest;
mod routes;
mod spatial;
mod storage;

use std::path::Path;
use std::process::ExitCode;

use axum::http::HeaderValue;
use axum::{extract::State, response::Html, routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

use config::Config;
use routes::AppState;
use spatial::Coverer;

/// Build a cache-controlled static file router.
///
/// Separated so tests can exercise the caching layer with arbitrary directories.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// Static routes for a built frontend in `dist_dir`. Hashed bundles under
/// `assets/` never change; everything else is revalidated daily.
fn static_router(dist_dir: &Path) -> Router {
    Router::new()
        .nest(
            "/assets",
            cached_static_router(&dist_dir.join("assets"), CACHE_IMMUTABLE),
        )
        .merge(cached_static_router(dist_dir, CACHE_1DAY))
}

/// Build the full application router.
fn build_app(state: AppState) -> Router {
    let static_files = static_router(&state.dist_dir);

    Router::new()
        .route("/", get(serve_index))
        .merge(routes::api_router())
        .with_state(state)
        .merge(static_files)
        .layer(CorsLayer::permissive())
}

async fn serve_index(State(state): State<AppState>) -> Html<String> {
    match std::fs::read_to_string(state.dist_dir.join("index.html")) {
        Ok(html) => Html(html),
        Err(_) => Html(
            r#"<!DOCTYPE html>
<html>
<head><title>Airspace Areas</title></head>
<body>
<h1>Airspace Areas</h1>
<p>Frontend not built yet. Area data is served from <code>/api/did_areas</code> and <code>/api/airport_areas</code>.</p>
</body>
</html>"#
                .to_string(),
        ),
    }
}

async fn run() -> Result<(), String> {
    let config = Config::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {}", parent.display(), e))?;
    }
    let storage = storage::Storage::open(&config.db_path)?;
    let coverer = Coverer::new(config.cell_level);
    tracing::info!(
        areas = storage.count_areas()?,
        cell_level = coverer.level(),
        db = %config.db_path.display(),
        "opened area database"
    );

    let app = build_app(AppState {
        storage,
        coverer,
        dist_dir: config.dist_dir.clone(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("failed to bind {}: {}", addr, e))?;
    tracing::info!("Server running at http://localhost:{}", config.port);

    axum::serve(listener, app).await.map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    /// Create a temp dir with a test file and return the dir path.
    fn temp_dir_with_file(file_name: &str, content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(file_name), content).unwrap();
        dir
    }

    /// A dist dir with an index, a favicon and one hashed bundle.
    fn dist_dir() -> tempfile::TempDir {
        let dir = temp_dir_with_file("index.html", "<html>viewer</html>");
        std::fs::write(dir.path().join("favicon.svg"), "<svg/>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets/main-abc123.css"), "body{}").unwrap();
        dir
    }

    fn test_app(dist: &Path) -> (tempfile::TempDir, Router) {
        let db_dir = tempfile::tempdir().unwrap();
        let storage = storage::Storage::open(&db_dir.path().join("areas.redb")).unwrap();
        let app = build_app(AppState {
            storage,
            coverer: Coverer::new(13),
            dist_dir: dist.to_path_buf(),
        });
        (db_dir, app)
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_dist_assets_have_immutable_cache() {
        let dist = dist_dir();
        let (_db, app) = test_app(dist.path());

        let resp = get(app, "/assets/main-abc123.css").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("cache-control").unwrap(),
            "public, max-age=31536000, immutable"
        );
    }

    #[tokio::test]
    async fn test_other_dist_files_have_1day_cache() {
        let dist = dist_dir();
        let (_db, app) = test_app(dist.path());

        let resp = get(app, "/favicon.svg").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("cache-control").unwrap(),
            "public, max-age=86400, must-revalidate"
        );
    }

    #[tokio::test]
    async fn test_missing_static_file_returns_404() {
        let dist = dist_dir();
        let (_db, app) = test_app(dist.path());

        let resp = get(app, "/assets/nonexistent.js").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_index_served_from_dist() {
        let dist = dist_dir();
        let (_db, app) = test_app(dist.path());

        let resp = get(app, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<html>viewer</html>");
    }

    #[tokio::test]
    async fn test_index_falls_back_without_build() {
        let empty = tempfile::tempdir().unwrap();
        let (_db, app) = test_app(empty.path());

        let resp = get(app, "/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("Frontend not built yet"));
    }

    #[tokio::test]
    async fn test_api_routes_are_mounted() {
        let dist = dist_dir();
        let (_db, app) = test_app(dist.path());

        let resp = get(
            app,
            "/api/did_areas?bounds=35.72,139.80,35.66,139.80,35.66,139.70,35.72,139.70",
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"type": "FeatureCollection", "features": []}));
    }
}
