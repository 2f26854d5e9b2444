use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

/// A parsed two-line element set together with the time it was fetched.
#[derive(Debug, Clone)]
pub struct OrbitalElements {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
    pub elements: sgp4::Elements,
    pub fetched_at: DateTime<Utc>,
}

impl OrbitalElements {
    pub fn norad_id(&self) -> u64 {
        self.elements.norad_id
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.fetched_at
    }
}

/// Lighting conditions at the peak of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Visibility {
    /// Satellite sunlit against a dark sky.
    Visible,
    /// Sky too bright to spot the satellite.
    Daylight,
    /// Satellite inside Earth's shadow.
    Eclipsed,
}

/// A predicted pass. Times are tick-aligned, see [`crate::predict::find_passes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictedPass {
    pub pass_id: String,
    pub rise_time: DateTime<Utc>,
    pub peak_time: DateTime<Utc>,
    pub set_time: DateTime<Utc>,
    pub peak_altitude: f64,
    pub azimuth: f64,
    pub magnitude: f64,
    pub duration_minutes: f64,
    pub range_km: f64,
    pub sun_altitude: f64,
    pub visibility: Visibility,
}
