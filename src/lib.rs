pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::handlers::{health, metrics, query, AppState};

pub fn create_app(state: AppState) -> anyhow::Result<Router> {
    let api = Router::new()
        .route("/query", post(query::execute_query))
        .route("/operations", get(query::list_operations))
        .route("/hour", get(query::get_hour))
        .route("/day", get(query::get_day))
        .route("/month", get(query::get_month))
        .route("/hours", get(query::get_hours))
        .route("/days", get(query::get_days))
        .route("/months", get(query::get_months))
        .route("/total", get(query::get_total))
        .route("/distrousage", get(query::get_distro_usage));

    let mut app = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api/v1", api);

    if let Some(dir) = &state.config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app = app
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::metrics_middleware,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        );

    if let Some(cors) = cors_layer(&state.config)? {
        app = app.layer(cors);
    }

    Ok(app.with_state(state))
}

fn cors_layer(config: &Config) -> anyhow::Result<Option<CorsLayer>> {
    let Some(origin) = &config.cors_origin else {
        return Ok(None);
    };

    let layer = CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Ok(Some(layer))
}
