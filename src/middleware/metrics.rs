use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::handlers::AppState;

pub async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "fallback".to_string());

    // Records duration on drop
    let _timer = state.metrics.start_timer(format!("{} {}", method, endpoint));

    let response = next.run(request).await;

    let status = response.status();
    state.metrics.record_request(method.as_str(), status.as_u16());
    if status.is_server_error() {
        state.metrics.record_error("server_error");
    } else if status.is_client_error() {
        state.metrics.record_error("client_error");
    }

    response
}
