use axum::{extract::State, Json};
use serde_json::{json, Value};

use service::accounts::{self, LoginInput, RegisterInput};

use crate::errors::JsonApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<Json<Value>, JsonApiError> {
    let user = accounts::register(&state.store, input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "User registered successfully",
        "user": user,
    })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<Json<Value>, JsonApiError> {
    let session = accounts::login(&state.store, input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "user": session.user,
        "access_token": session.access_token,
        "token_type": session.token_type,
    })))
}
