use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

use common::types::Health;
use service::storage::Collection;

use crate::state::AppState;

pub mod auth;
pub mod collections;
pub mod debug;
pub mod profiles;
pub mod sensors;
pub mod users;

pub const SERVICE_NAME: &str = "RadSafe Database API";

/// Permissive CORS when no origins are configured, otherwise an allow-list.
pub fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::very_permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Liveness only; `/api/health` reports on the store.
pub async fn liveness() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn home() -> Html<&'static str> {
    Html(include_str!("home.html"))
}

pub async fn api_test() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "RadSafe Database is working",
        "timestamp": Utc::now(),
        "endpoints": {
            "GET /api/health": "Health check",
            "POST /api/auth/register": "Create an account",
            "POST /api/auth/login": "Log in",
            "GET /api/users": "List all users",
            "GET /api/users/:id": "Get specific user",
            "PUT /api/users/:id": "Update user (mirrors onto profile)",
            "GET /api/profiles": "List all profiles",
            "GET /api/profiles/user/:id": "Get user profile",
            "GET /api/collections/:name": "List any collection",
            "GET /api/radiation/current": "Current radiation level",
            "GET /api/radiation/search?location=": "Radiation estimate for a place",
            "GET /api/proximity/status": "Proximity sensor status",
            "GET /api/system/status": "System status"
        },
        "status": "operational"
    }))
}

/// Health reflects the store: `degraded` while the document is unreadable.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let doc = state.store.load().await;
    let status = if state.store.is_degraded() { "degraded" } else { "healthy" };
    Json(json!({
        "status": status,
        "service": SERVICE_NAME,
        "database_file": state.store.location(),
        "timestamp": Utc::now(),
        "users_count": doc.collection(Collection::Users).len(),
        "profiles_count": doc.collection(Collection::Profiles).len(),
    }))
}

/// Build the full application router.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/api/test", get(api_test))
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/users", get(users::list_users))
        .route("/api/users/:id", get(users::get_user).put(users::update_user))
        .route("/api/profiles", get(profiles::list_profiles).post(profiles::create_profile))
        .route("/api/profiles/user/:user_id", get(profiles::get_user_profile))
        .route(
            "/api/collections/:name",
            get(collections::list_records).post(collections::create_record),
        )
        .route(
            "/api/collections/:name/:id",
            get(collections::get_record).put(collections::update_record),
        )
        .route("/api/radiation/current", get(sensors::current_radiation))
        .route("/api/radiation/history", get(sensors::radiation_history))
        .route("/api/radiation/search", get(sensors::search_radiation))
        .route("/api/proximity/status", get(sensors::proximity_status))
        .route("/api/proximity/alert", post(sensors::proximity_alert))
        .route("/api/system/status", get(sensors::system_status))
        .route("/api/debug", get(debug::dump));

    Router::new()
        .route("/", get(home))
        .route("/health", get(liveness))
        .merge(api)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                // 每次请求创建 span，包含方法和路径
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx 以 ERROR 记录
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
