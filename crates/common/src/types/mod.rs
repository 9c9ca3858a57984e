use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Latitude/longitude pair as returned by the geocoder.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}
