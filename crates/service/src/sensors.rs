//! Simulated radiation and proximity sensors.
//!
//! Every generator takes the RNG explicitly; handlers pass `thread_rng()`,
//! tests pass a seeded `StdRng`.

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

pub const UNIT: &str = "μSv/h";
/// Readings at or above this are flagged on the live feed.
pub const WARNING_LEVEL: f64 = 0.25;
/// Anything closer than this is "near".
pub const NEAR_CM: u32 = 30;
const HISTORY_LEN: usize = 10;
const HISTORY_SPACING_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RadiationStatus {
    Safe,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Serialize)]
pub struct RadiationReading {
    pub radiation_level: f64,
    pub unit: &'static str,
    pub status: RadiationStatus,
    pub color: &'static str,
    pub message: &'static str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryPoint {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RadiationHistory {
    pub history: Vec<HistoryPoint>,
    pub count: usize,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProximityStatus {
    pub distance_cm: u32,
    pub proximity: &'static str,
    pub is_near: bool,
    pub alert_active: bool,
    pub recommendation: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationRadiation {
    pub level: f64,
    pub status: RadiationStatus,
    pub timestamp: DateTime<Utc>,
    pub source: &'static str,
}

pub const SAFETY_TIPS: [&str; 4] = [
    "Move phone at least 30cm away",
    "Use speakerphone or headphones",
    "Avoid carrying in pocket",
    "Store in bag when not in use",
];

pub const ALERT_ACTIONS: [&str; 3] = [
    "Vibration activated",
    "Visual warning displayed",
    "Safety instructions shown",
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn background_level<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    round2(rng.gen_range(0.10..=0.20))
}

pub fn current_radiation<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> RadiationReading {
    let level = background_level(rng);
    let safe = level < WARNING_LEVEL;
    RadiationReading {
        radiation_level: level,
        unit: UNIT,
        status: if safe { RadiationStatus::Safe } else { RadiationStatus::Warning },
        color: if safe { "#10b981" } else { "#ef4444" },
        message: if safe { "Normal background radiation" } else { "Elevated level detected" },
        timestamp: now,
    }
}

/// Last readings, newest first, spaced five minutes apart.
pub fn radiation_history<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> RadiationHistory {
    let history: Vec<HistoryPoint> = (0..HISTORY_LEN)
        .map(|i| HistoryPoint {
            value: background_level(rng),
            timestamp: now - Duration::minutes(HISTORY_SPACING_MINUTES * i as i64),
        })
        .collect();
    let average = round2(history.iter().map(|h| h.value).sum::<f64>() / history.len() as f64);
    RadiationHistory { count: history.len(), history, average }
}

pub fn proximity_status<R: Rng + ?Sized>(rng: &mut R) -> ProximityStatus {
    let distance_cm = rng.gen_range(15..=100);
    let is_near = distance_cm < NEAR_CM;
    ProximityStatus {
        distance_cm,
        proximity: if is_near { "near" } else { "far" },
        is_near,
        alert_active: is_near,
        recommendation: if is_near { "Move phone away" } else { "Safe distance maintained" },
    }
}

pub fn classify_location_level(level: f64) -> RadiationStatus {
    if level < 0.2 {
        RadiationStatus::Safe
    } else if level < 0.5 {
        RadiationStatus::Warning
    } else {
        RadiationStatus::Danger
    }
}

/// Simulated level for a coordinate; the same place always gets the same value.
pub fn location_radiation(latitude: f64, longitude: f64, now: DateTime<Utc>) -> LocationRadiation {
    let seed = ((latitude + longitude).abs() * 1000.0).to_bits();
    let r: f64 = StdRng::seed_from_u64(seed).gen();
    let level = round2(0.05 + r * 1.5);
    LocationRadiation {
        level,
        status: classify_location_level(level),
        timestamp: now,
        source: "Backend Simulation",
    }
}
