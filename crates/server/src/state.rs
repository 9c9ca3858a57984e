use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use service::storage::RecordStore;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub http: reqwest::Client,
    pub geocoder_url: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, geocoder_url: impl Into<String>, geocoder_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(geocoder_timeout).build()?;
        Ok(Self { store, http, geocoder_url: geocoder_url.into(), started_at: Utc::now() })
    }
}
