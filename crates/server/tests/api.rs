use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    extract::Query,
    http::{header, Method, Request, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use server::{routes, state::AppState};
use service::storage::{MemoryStorage, RecordStore};

fn app_with(storage: MemoryStorage, geocoder_url: &str) -> Router {
    let store = RecordStore::new(Arc::new(storage), true);
    let state = AppState::new(store, geocoder_url, Duration::from_secs(5)).expect("state");
    routes::build_router(state, routes::build_cors(&[]))
}

fn app() -> Router {
    app_with(MemoryStorage::new(), "http://127.0.0.1:1")
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(b) => Body::from(b.to_string()),
        None => Body::empty(),
    };
    send(app, method, uri, body).await
}

async fn send(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .expect("request");
    let resp = app.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_reports_seeded_counts() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["users_count"], 1);
    assert_eq!(body["profiles_count"], 0);
    assert_eq!(body["database_file"], "memory");
}

#[tokio::test]
async fn health_is_degraded_on_corrupt_document() {
    let app = app_with(MemoryStorage::with_raw("not json at all"), "http://127.0.0.1:1");
    let (status, body) = call(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["users_count"], 0);

    let (_, users) = call(&app, Method::GET, "/api/users", None).await;
    assert_eq!(users, json!([]));
}

#[tokio::test]
async fn register_login_and_fetch_user() {
    let app = app();
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        Some(json!({ "email": "c@x.com", "password": "pw", "full_name": "C" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], 2);
    assert!(body["user"].get("password").is_none());

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/register",
        Some(json!({ "email": "c@x.com", "password": "pw", "full_name": "C" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, Method::POST, "/api/auth/register", Some(json!({ "email": "d@x.com" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Error");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "email": "c@x.com", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(body["access_token"].as_str().unwrap().starts_with("token_2_"));

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        Some(json!({ "email": "c@x.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/api/users/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "c@x.com");
    assert!(body.get("password").is_none());

    let (_, users) = call(&app, Method::GET, "/api/users", None).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
    assert!(users.as_array().unwrap().iter().all(|u| u.get("password").is_none()));
}

#[tokio::test]
async fn updating_user_mirrors_onto_single_profile() {
    let app = app();

    let (status, body) = call(&app, Method::PUT, "/api/users/1", Some(json!({ "name": "B" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User 1 updated");
    assert_eq!(body["user"]["name"], "B");
    assert_eq!(body["user"]["id"], 1);
    assert!(body["user"]["updatedAt"].is_string());

    let (_, profile) = call(&app, Method::GET, "/api/profiles/user/1", None).await;
    assert_eq!(profile["userId"], 1);
    assert_eq!(profile["name"], "B");

    call(&app, Method::PUT, "/api/users/1", Some(json!({ "phone": "555" }))).await;
    let (_, profiles) = call(&app, Method::GET, "/api/profiles", None).await;
    let profiles = profiles.as_array().unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["name"], "B");
    assert_eq!(profiles[0]["phone"], "555");

    let (status, body) = call(&app, Method::PUT, "/api/users/99", Some(json!({ "name": "Z" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
    let (status, _) = call(&app, Method::GET, "/api/users/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_profile_is_empty_object() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/profiles/user/42", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));

    let (status, body) = call(&app, Method::POST, "/api/profiles", Some(json!({ "bio": "hi" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["id"], 1);
}

#[tokio::test]
async fn one_profile_per_user_is_enforced() {
    let app = app();
    call(&app, Method::PUT, "/api/users/1", Some(json!({ "name": "B" }))).await;

    let (status, body) = call(&app, Method::POST, "/api/profiles", Some(json!({ "userId": 1, "bio": "x" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (status, other) = call(&app, Method::POST, "/api/profiles", Some(json!({ "userId": 7 }))).await;
    assert_eq!(status, StatusCode::OK);
    let other_id = other["profile"]["id"].as_u64().unwrap();
    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/api/collections/profiles/{}", other_id),
        Some(json!({ "userId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, profiles) = call(&app, Method::GET, "/api/profiles", None).await;
    let owners: Vec<&Value> = profiles.as_array().unwrap().iter().map(|p| &p["userId"]).collect();
    assert_eq!(owners, vec![&json!(1), &json!(7)]);
}

#[tokio::test]
async fn password_never_reaches_profile_endpoints() {
    let app = app();
    let (status, _) = call(&app, Method::PUT, "/api/users/1", Some(json!({ "password": "s3cret", "phone": "1" }))).await;
    assert_eq!(status, StatusCode::OK);

    for uri in ["/api/profiles", "/api/profiles/user/1", "/api/collections/profiles", "/api/collections/profiles/1"] {
        let (status, body) = call(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert!(!body.to_string().contains("s3cret"), "{} leaked the password", uri);
    }
}

#[tokio::test]
async fn malformed_input_is_a_json_bad_request() {
    let app = app();

    let (status, body) = call(&app, Method::POST, "/api/collections/readings", Some(json!([1]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Error");
    assert!(body["message"].is_string());

    let (status, body) = send(&app, Method::PUT, "/api/users/1", Body::from("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Error");

    let (status, body) = call(&app, Method::GET, "/api/users/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Error");

    let (status, _) = call(&app, Method::GET, "/api/collections/readings/-3", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generic_collection_crud() {
    let app = app();

    let (status, rec) = call(
        &app,
        Method::POST,
        "/api/collections/readings",
        Some(json!({ "value": 0.14, "unit": "μSv/h" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rec["id"], 1);
    assert_eq!(rec["createdAt"], rec["updatedAt"]);

    let (status, found) = call(&app, Method::GET, "/api/collections/readings/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, rec);

    let (status, updated) = call(
        &app,
        Method::PUT,
        "/api/collections/readings/1",
        Some(json!({ "value": 0.18, "id": 77 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], 1);
    assert_eq!(updated["value"], 0.18);
    assert_eq!(updated["unit"], "μSv/h");

    let (status, _) = call(&app, Method::PUT, "/api/collections/readings/5", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::GET, "/api/collections/widgets", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::POST, "/api/collections/users", Some(json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sensor_endpoints() {
    let app = app();

    let (status, body) = call(&app, Method::GET, "/api/radiation/current", None).await;
    assert_eq!(status, StatusCode::OK);
    let level = body["radiation_level"].as_f64().unwrap();
    assert!((0.10..=0.20).contains(&level));
    assert_eq!(body["status"], "safe");

    let (_, body) = call(&app, Method::GET, "/api/radiation/history", None).await;
    assert_eq!(body["count"], 10);

    let (_, body) = call(&app, Method::GET, "/api/proximity/status", None).await;
    let distance = body["distance_cm"].as_u64().unwrap();
    assert_eq!(body["is_near"], distance < 30);

    let (status, body) = call(&app, Method::POST, "/api/proximity/alert", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["safety_tips"].as_array().unwrap().len(), 4);

    let (_, body) = call(&app, Method::GET, "/api/system/status", None).await;
    assert_eq!(body["status"], "operational");
    assert_eq!(body["components"]["database"]["status"], "connected");
}

async fn spawn_fake_geocoder() -> anyhow::Result<String> {
    async fn search(Query(q): Query<std::collections::HashMap<String, String>>) -> Json<Value> {
        match q.get("q").map(String::as_str) {
            Some("New York") => Json(json!([{ "lat": "40.7127", "lon": "-74.0059" }])),
            _ => Json(json!([])),
        }
    }
    let router = Router::new().route("/search", get(search));
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{}", addr))
}

#[tokio::test]
async fn radiation_search_uses_geocoder() -> anyhow::Result<()> {
    let geocoder = spawn_fake_geocoder().await?;
    let app = app_with(MemoryStorage::new(), &geocoder);

    let (status, body) = call(&app, Method::GET, "/api/radiation/search?location=New%20York", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"], "New York");
    assert_eq!(body["coordinates"]["latitude"], 40.7127);
    assert!(["safe", "warning", "danger"].contains(&body["radiation"]["status"].as_str().unwrap()));

    let (status, _) = call(&app, Method::GET, "/api/radiation/search?location=Atlantis", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::GET, "/api/radiation/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn radiation_search_upstream_down_is_bad_gateway() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/radiation/search?location=Paris", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Upstream Error");
}

#[tokio::test]
async fn home_and_test_pages() {
    let app = app();
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("RadSafe Database Server"));

    let (status, body) = call(&app, Method::GET, "/api/test", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
}

#[tokio::test]
async fn liveness_probe() {
    let (status, body) = call(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
