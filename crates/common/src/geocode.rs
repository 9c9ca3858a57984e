//! Outbound geocoding lookup against a Nominatim-compatible endpoint.

use serde::Deserialize;

use crate::{types::Coordinates, CoreError};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

// Nominatim asks every client to identify itself.
const USER_AGENT: &str = concat!("radsafe/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Resolve a free-form location to coordinates.
///
/// Returns `Ok(None)` when the service answers with no match.
pub async fn lookup(
    client: &reqwest::Client,
    base_url: &str,
    location: &str,
) -> Result<Option<Coordinates>, CoreError> {
    let url = format!("{}/search", base_url.trim_end_matches('/'));
    let resp = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, USER_AGENT)
        .query(&[("format", "json"), ("q", location), ("limit", "1")])
        .send()
        .await
        .map_err(|e| CoreError::Network(e.to_string()))?
        .error_for_status()
        .map_err(|e| CoreError::Network(e.to_string()))?;
    let places = resp
        .json::<Vec<Place>>()
        .await
        .map_err(|e| CoreError::Parse(e.to_string()))?;

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    let latitude = place
        .lat
        .parse::<f64>()
        .map_err(|e| CoreError::Parse(format!("lat: {e}")))?;
    let longitude = place
        .lon
        .parse::<f64>()
        .map_err(|e| CoreError::Parse(format!("lon: {e}")))?;
    Ok(Some(Coordinates { latitude, longitude }))
}
