use axum::{
    extract::State,
    Json,
};
use serde_json::{json, Map, Value};

use service::{
    accounts::public_view,
    storage::{Collection, Record},
};

use crate::errors::JsonApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

/// 列出全部用户（不含密码）
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<Record>> {
    let users = state.store.list(Collection::Users).await;
    Json(users.iter().map(public_view).collect())
}

pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> Result<Json<Record>, JsonApiError> {
    match state.store.find_by_id(Collection::Users, id).await {
        Some(user) => Ok(Json(public_view(&user))),
        None => Err(JsonApiError::not_found("User")),
    }
}

/// Merge the body into the user; the user's profile receives the same fields.
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(fields): ApiJson<Map<String, Value>>,
) -> Result<Json<Value>, JsonApiError> {
    let Some(user) = state.store.update(Collection::Users, id, fields).await? else {
        return Err(JsonApiError::not_found("User"));
    };
    Ok(Json(json!({
        "success": true,
        "message": format!("User {} updated", id),
        "user": public_view(&user),
    })))
}
