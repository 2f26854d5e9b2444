use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use clap::ValueEnum;
use strum_macros::Display;
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    ValueEnum,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Weather {
    Clear,
    PartlyCloudy,
    Cloudy,
    Overcast,
    Rainy,
}

/// A user's report on whether a predicted pass was seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ObservationRecord {
    pub pass_id: String,
    pub success: bool,
    pub weather: Weather,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
    /// Altitude the user estimated at culmination, degrees.
    #[serde(default)]
    pub actual_altitude: Option<f64>,
}

impl ObservationRecord {
    pub fn new(pass_id: impl Into<String>, success: bool, weather: Weather) -> Self {
        Self {
            pass_id: pass_id.into(),
            success,
            weather,
            notes: String::new(),
            observed_at: None,
            actual_altitude: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.pass_id.trim().is_empty() {
            return Err("pass_id must not be empty".into());
        }
        match self.actual_altitude {
            Some(alt) if !(0.0..=90.0).contains(&alt) => {
                Err(format!("actual_altitude {} outside [0, 90]", alt))
            }
            _ => Ok(()),
        }
    }
}
