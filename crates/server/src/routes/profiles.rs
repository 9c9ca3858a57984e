use axum::{
    extract::State,
    Json,
};
use serde_json::{json, Map, Value};

use service::{
    accounts::public_view,
    storage::{Collection, Record, USER_ID},
};

use crate::errors::JsonApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

pub async fn list_profiles(State(state): State<AppState>) -> Json<Vec<Record>> {
    let profiles = state.store.list(Collection::Profiles).await;
    Json(profiles.iter().map(public_view).collect())
}

pub async fn create_profile(
    State(state): State<AppState>,
    ApiJson(fields): ApiJson<Map<String, Value>>,
) -> Result<Json<Value>, JsonApiError> {
    let profile = state.store.insert(Collection::Profiles, fields).await?;
    Ok(Json(json!({ "success": true, "profile": public_view(&profile) })))
}

/// Profile for a user, or `{}` when the user has none yet.
pub async fn get_user_profile(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<u64>,
) -> Json<Value> {
    let profile = state
        .store
        .find_by_field(Collection::Profiles, USER_ID, &Value::from(user_id))
        .await;
    Json(profile.map(|p| public_view(&p).to_value()).unwrap_or_else(|| json!({})))
}
