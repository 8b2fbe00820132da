// Pollen Levels API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod config;
mod errors;
mod routes;
mod services;
mod util;

use config::AppConfig;
use services::scheduler::{Instance, Registry, SharedRegistry};

/// Pollen Levels API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pollen Levels API",
        version = "0.1.0",
        description = "Pollen level monitoring service. Polls the Google Pollen \
            forecast API per configured location, normalizes the response into a \
            stable map of sensor entities (pollen types and plants with current \
            values, forecasts, trend and expected-peak analytics), and publishes \
            the latest snapshot with manual-refresh and diagnostics endpoints.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Sensors", description = "Published sensor snapshots"),
        (name = "Refresh", description = "Manual refresh triggers"),
        (name = "Diagnostics", description = "Redacted runtime diagnostics"),
        (name = "Status", description = "Scheduler status"),
    ),
    paths(
        routes::health::health_check,
        routes::sensors::get_sensors,
        routes::refresh::refresh_all,
        routes::refresh::refresh_one,
        routes::diagnostics::get_diagnostics,
        routes::status::get_status,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::refresh::RefreshResponse,
            routes::diagnostics::DiagnosticsResponse,
            routes::diagnostics::DiagnosticsConfig,
            routes::diagnostics::RequestParamsExample,
            services::scheduler::InstanceStatus,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pollen_levels_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_config = AppConfig::from_env();

    // One pipeline instance per configured location. Each owns its snapshot
    // and is driven by its own scheduler task, so instances never share
    // mutable state.
    let instance = Arc::new(Instance::new(
        app_config.location.clone(),
        &app_config.api_key,
        app_config.http_referrer.as_deref(),
    ));
    let registry: SharedRegistry = Arc::new(Registry::new(vec![instance.clone()]));
    tokio::spawn(services::scheduler::run_instance(instance));

    // CORS — read-mostly API; refresh triggers are POSTs with no body.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route(
            "/api/v1/sensors/:instance_id",
            get(routes::sensors::get_sensors),
        )
        .route("/api/v1/refresh", post(routes::refresh::refresh_all))
        .route(
            "/api/v1/refresh/:instance_id",
            post(routes::refresh::refresh_one),
        )
        .route(
            "/api/v1/diagnostics/:instance_id",
            get(routes::diagnostics::get_diagnostics),
        )
        .route("/api/v1/status", get(routes::status::get_status))
        .with_state(registry)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        app_config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
