use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// Full document dump plus facts about the backing file.
pub async fn dump(State(state): State<AppState>) -> Json<Value> {
    let doc = state.store.load().await;
    let size = state.store.persisted_len().await;
    Json(json!({
        "database": doc,
        "database_file": state.store.location(),
        "file_exists": size.is_some(),
        "file_size": size.unwrap_or(0),
        "degraded": state.store.is_degraded(),
        "current_time": Utc::now(),
    }))
}
