//! # imani: image and PDF editing over HTTP
//!
//! `imani` is a small HTTP service that edits images, manipulates PDFs, extracts text from both,
//! and keeps a minimal directory of users.
//!
//! ## Overview
//!
//! Clients upload a file, get back the path it was stored under, and then pass that path to the
//! editing endpoints. Every editing endpoint writes its result next to the uploads (images) or
//! into the PDF output directory, and answers with the path of the new file. Nothing is deleted
//! automatically.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer and
//! uses SQLite through SQLx for the user table.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes the editing endpoints and the user resource. Editing
//! endpoints accept `multipart/form-data` or url-encoded forms; the user resource speaks JSON.
//!
//! The **editor** ([`editor`]) wraps the image, PDF and OCR libraries. It is synchronous and CPU
//! bound, so handlers run it on tokio's blocking pool.
//!
//! The **database layer** ([`db`]) uses the repository pattern for the `users` table.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use imani::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = imani::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     imani::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! Migrations are embedded and run on startup:
//!
//! ```no_run
//! # use sqlx::SqlitePool;
//! # async fn example(pool: SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
//! imani::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod db;
pub mod editor;
pub mod errors;
mod openapi;
pub mod storage;
pub mod telemetry;
mod types;

#[cfg(test)]
mod test_utils;

use crate::{config::CorsOrigin, openapi::ApiDoc, storage::StoragePaths};
use axum::{
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{get, post},
    Router,
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, instrument, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::UserId;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .db(pool)
///     .storage(config.storage_paths())
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
    pub storage: StoragePaths,
}

/// Get the imani database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to the configured database and bring the schema up to date.
#[instrument(skip_all)]
async fn setup_database(config: &Config) -> anyhow::Result<SqlitePool> {
    let settings = &config.database.pool;
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout())
        .idle_timeout(settings.idle_timeout())
        .max_lifetime(settings.max_lifetime())
        .connect(&config.database.url)
        .await?;

    migrator().run(&pool).await?;
    info!("Database ready");

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;

    let allow_origin = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([http::Method::GET, http::Method::POST, http::Method::PUT])
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - Image and PDF editing routes
/// - User routes
/// - OpenAPI documentation at `/docs`
/// - Optional Prometheus metrics
/// - CORS configuration
/// - Tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let body_limit = match state.config.max_upload_size {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    let router = Router::new()
        .route("/", get(|| async { "Healthy" }))
        // Images
        .route("/upload/", post(api::handlers::images::upload_image))
        .route("/resize/", post(api::handlers::images::resize_image))
        .route("/rotate/", post(api::handlers::images::rotate_image))
        .route("/filter/", post(api::handlers::images::filter_image))
        .route("/reset/", post(api::handlers::images::reset_image))
        .route("/extract_text_from_image/", post(api::handlers::images::extract_text_from_image))
        // PDFs
        .route("/upload_pdf/", post(api::handlers::pdfs::upload_pdf))
        .route("/convert_to_images/", post(api::handlers::pdfs::convert_to_images))
        .route("/split_pdf/", post(api::handlers::pdfs::split_pdf))
        .route("/merge_pdfs/", post(api::handlers::pdfs::merge_pdfs))
        .route("/extract_text/", post(api::handlers::pdfs::extract_text))
        // Users
        .route(
            "/users/",
            get(api::handlers::users::list_users).post(api::handlers::users::create_user),
        )
        .route(
            "/users/{user_id}",
            get(api::handlers::users::get_user).put(api::handlers::users::update_user),
        )
        .layer(body_limit)
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let mut router = router.layer(create_cors_layer(&state.config)?);

    // Add Prometheus metrics if enabled
    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources.
///
/// 1. **Create**: [`Application::new`] connects to the database, runs migrations and creates the
///    storage directories
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, in-flight requests finish and the pool
///    is closed
pub struct Application {
    router: Router,
    config: Config,
    pool: SqlitePool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting imani with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Create an application on an existing, already migrated pool
    pub async fn new_with_pool(config: Config, pool: SqlitePool) -> anyhow::Result<Self> {
        let storage = config.storage_paths();
        storage.initialize().await?;

        let app_state = AppState::builder()
            .db(pool.clone())
            .storage(storage)
            .config(config.clone())
            .build();

        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "imani listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Close database connections
        info!("Closing database connections...");
        self.pool.close().await;

        // Shutdown telemetry
        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{build_router, AppState, Application};
    use crate::config::CorsOrigin;
    use crate::test_utils::create_test_config;
    use axum::http::{header, HeaderValue, StatusCode};
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_application_serves_health_check(pool: SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path());
        let storage = config.storage_paths();

        let server = Application::new_with_pool(config, pool)
            .await
            .expect("Failed to create application")
            .into_test_server();

        assert!(storage.images.is_dir());
        assert!(storage.pdfs.is_dir());

        let response = server.get("/").await;
        response.assert_status_ok();
        response.assert_text("Healthy");
    }

    #[sqlx::test]
    async fn test_docs_are_served(pool: SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let server = Application::new_with_pool(create_test_config(dir.path()), pool)
            .await
            .unwrap()
            .into_test_server();

        let response = server.get("/docs").await;
        response.assert_status_ok();
        assert!(response.text().contains("/upload/"));
    }

    #[sqlx::test]
    async fn test_upload_limit_applies_when_configured(pool: SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config(dir.path());
        config.max_upload_size = Some(16);
        let server = Application::new_with_pool(config, pool).await.unwrap().into_test_server();

        let response = server
            .post("/resize/")
            .form(&[("file_path", "x".repeat(64)), ("width", "10".to_string())])
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[sqlx::test]
    async fn test_cors_wildcard_allows_any_origin(pool: SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config(dir.path());
        config.cors.allowed_origins = vec![CorsOrigin::Wildcard];
        let server = Application::new_with_pool(config, pool).await.unwrap().into_test_server();

        let response = server
            .get("/")
            .add_header(header::ORIGIN, HeaderValue::from_static("https://somewhere.example"))
            .await;

        response.assert_status_ok();
        assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN), "*");
    }

    #[sqlx::test]
    async fn test_build_router_with_metrics_disabled(pool: SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path());
        let app_state = AppState::builder()
            .db(pool)
            .storage(config.storage_paths())
            .config(config)
            .build();

        let router = build_router(&app_state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        let metrics_response = server.get("/internal/metrics").await;
        metrics_response.assert_status(StatusCode::NOT_FOUND);
    }

    // The Prometheus recorder is process global, so this is the only test that enables it.
    #[sqlx::test]
    async fn test_build_router_with_metrics_enabled(pool: SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_test_config(dir.path());
        config.enable_metrics = true;
        let app_state = AppState::builder()
            .db(pool)
            .storage(config.storage_paths())
            .config(config)
            .build();

        let router = build_router(&app_state).expect("Failed to build router");
        let server = axum_test::TestServer::new(router).expect("Failed to create test server");

        server.get("/").await.assert_status_ok();

        let metrics_response = server.get("/internal/metrics").await;
        assert_eq!(metrics_response.status_code().as_u16(), 200);

        let metrics_content = metrics_response.text();
        assert!(metrics_content.contains("# HELP") || metrics_content.contains("# TYPE"));
    }
}
