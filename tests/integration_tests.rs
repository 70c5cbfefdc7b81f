use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mirrorband_api::{config::Config, create_app, database::Database, handlers::AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

async fn setup_app() -> (TempDir, Database, Router) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config::for_database(format!(
        "sqlite://{}",
        dir.path().join("mirrorband.sqlite").display()
    ));

    let db = Database::new(&config).await.expect("Failed to open test database");
    seed(&db).await;

    let state = AppState::new(db.clone(), config).expect("Failed to build state");
    let app = create_app(state).expect("Failed to build app");
    (dir, db, app)
}

async fn seed(db: &Database) {
    for (time, rx) in [("Mar/04/2019", 4_000i64), ("Mar/05/2019", 5_000)] {
        sqlx::query("INSERT INTO day (time, rx, tx, rate) VALUES (?1, ?2, ?3, ?4)")
            .bind(time)
            .bind(rx)
            .bind(rx * 2)
            .bind(0.5)
            .execute(db.pool())
            .await
            .unwrap();
    }
    sqlx::query("INSERT INTO hour (time, rx, tx, rate) VALUES ('Mar/05/2019 09:00', 9, 18, 0.75)")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO agg (total) VALUES (1500000000)")
        .execute(db.pool())
        .await
        .unwrap();
    for (distro, bytes) in [("ubuntu", 1_500_000_000i64), ("fedora", 2_000_000_000)] {
        sqlx::query("INSERT INTO distrousage (time, distro, bytes) VALUES ('Mar/05/2019', ?1, ?2)")
            .bind(distro)
            .bind(bytes)
            .execute(db.pool())
            .await
            .unwrap();
    }
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn post_query(app: Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/query")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health_check() {
    let (_dir, _db, app) = setup_app().await;

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_readiness_reports_store() {
    let (_dir, _db, app) = setup_app().await;

    let (status, body) = get(app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["store"], "healthy");
}

#[tokio::test]
async fn test_day_endpoint() {
    let (_dir, _db, app) = setup_app().await;

    let (status, body) = get(app, "/api/v1/day?date=Mar/05/2019").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "date": "Mar/05/2019", "rx": 5000, "tx": 10000, "rate": 0.5 }));
}

#[tokio::test]
async fn test_missing_day_is_404() {
    let (_dir, _db, app) = setup_app().await;

    let (status, body) = get(app, "/api/v1/day?date=Jan/01/1970").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_hour_out_of_range_is_400() {
    let (_dir, _db, app) = setup_app().await;

    let (status, _) = get(app, "/api/v1/hour?date=Mar/05/2019&hour=24").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_days_last_is_most_recent_first() {
    let (_dir, _db, app) = setup_app().await;

    let (status, body) = get(app, "/api/v1/days?last=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["date"], "Mar/05/2019");
    assert_eq!(body[1]["date"], "Mar/04/2019");
}

#[tokio::test]
async fn test_misspelled_query_param_is_400() {
    let (_dir, _db, app) = setup_app().await;

    let (status, _) = get(app.clone(), "/api/v1/days?frist=3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app, "/api/v1/distrousage?last_days=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_distro_usage_endpoint() {
    let (_dir, _db, app) = setup_app().await;

    let (status, body) = get(app, "/api/v1/distrousage?distros=ubuntu,fedora&lastDays=1&sortBiggest=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "date": "Mar/05/2019", "distro": "fedora", "bytes": 2000000000u64, "GB": 2.0 },
            { "date": "Mar/05/2019", "distro": "ubuntu", "bytes": 1500000000u64, "GB": 1.5 }
        ])
    );
}

#[tokio::test]
async fn test_query_dispatch() {
    let (_dir, _db, app) = setup_app().await;

    let (status, body) = post_query(
        app.clone(),
        json!({ "operation": "hour", "args": { "date": "Mar/05/2019", "hour": 9 } }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "Mar/05/2019 09:00");

    let (status, body) = post_query(app.clone(), json!({ "operation": "total" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "total": 1500000000u64 }));

    let (status, _) = post_query(app, json!({ "operation": "weeks" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_operations_catalog() {
    let (_dir, _db, app) = setup_app().await;

    let (status, body) = get(app, "/api/v1/operations").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 8);
    assert_eq!(body[7]["name"], "distrousage");
    assert_eq!(body[7]["returns"]["kind"], "list");
}

#[tokio::test]
async fn test_store_unavailable_is_503() {
    let (_dir, db, app) = setup_app().await;
    db.pool().close().await;

    let (status, body) = get(app, "/api/v1/total").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], 503);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (_dir, _db, app) = setup_app().await;

    let (status, _) = get(app.clone(), "/api/v1/total").await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("query_operations_total{operation=\"total\",outcome=\"ok\"} 1"));
}
