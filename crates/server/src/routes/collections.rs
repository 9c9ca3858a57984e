//! Generic access to any collection by name.

use axum::{
    extract::State,
    Json,
};
use serde_json::{Map, Value};

use service::{
    accounts::public_view,
    storage::{Collection, Record},
};

use crate::errors::JsonApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

fn parse_collection(name: &str) -> Result<Collection, JsonApiError> {
    name.parse::<Collection>().map_err(|_| JsonApiError::not_found("Collection"))
}

// users and profiles never leave the server with a password attached
fn expose(c: Collection, rec: Record) -> Record {
    match c {
        Collection::Users | Collection::Profiles => public_view(&rec),
        _ => rec,
    }
}

pub async fn list_records(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<Vec<Record>>, JsonApiError> {
    let c = parse_collection(&name)?;
    let records = state.store.list(c).await;
    Ok(Json(records.into_iter().map(|r| expose(c, r)).collect()))
}

pub async fn create_record(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
    ApiJson(fields): ApiJson<Map<String, Value>>,
) -> Result<Json<Record>, JsonApiError> {
    let c = parse_collection(&name)?;
    let rec = state.store.insert(c, fields).await?;
    Ok(Json(expose(c, rec)))
}

pub async fn get_record(
    State(state): State<AppState>,
    ApiPath((name, id)): ApiPath<(String, u64)>,
) -> Result<Json<Record>, JsonApiError> {
    let c = parse_collection(&name)?;
    state
        .store
        .find_by_id(c, id)
        .await
        .map(|r| Json(expose(c, r)))
        .ok_or_else(|| JsonApiError::not_found("Record"))
}

pub async fn update_record(
    State(state): State<AppState>,
    ApiPath((name, id)): ApiPath<(String, u64)>,
    ApiJson(fields): ApiJson<Map<String, Value>>,
) -> Result<Json<Record>, JsonApiError> {
    let c = parse_collection(&name)?;
    match state.store.update(c, id, fields).await? {
        Some(rec) => Ok(Json(expose(c, rec))),
        None => Err(JsonApiError::not_found("Record")),
    }
}
