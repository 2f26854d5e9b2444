use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use strum_macros::Display;
use thiserror::Error;
use utoipa::ToSchema;

use crate::observations::ObservationRecord;
use crate::predict::PredictedPass;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
    Observed,
    NotYetObserved,
    /// Observation whose pass id matches no prediction.
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MergedRecord {
    pub pass_id: String,
    pub prediction: Option<PredictedPass>,
    pub observation: Option<ObservationRecord>,
    pub status: MatchStatus,
}

impl MergedRecord {
    /// Observed minus predicted peak altitude, when both are known.
    pub fn altitude_error(&self) -> Option<f64> {
        let predicted = self.prediction.as_ref()?.peak_altitude;
        let observed = self.observation.as_ref()?.actual_altitude?;
        Some(observed - predicted)
    }
}

/// Non-fatal join problems, reported alongside the merged rows.
#[derive(Debug, Clone, PartialEq, Error, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    #[error("observation for pass {pass_id} matches no prediction")]
    UnmatchedObservation { pass_id: String },
    #[error("pass {pass_id} has {count} observations")]
    DuplicateObservation { pass_id: String, count: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct Merged {
    pub records: Vec<MergedRecord>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Full outer join of predictions and observations on `pass_id`.
///
/// Rows come out in a canonical order (predicted passes by rise time, then
/// unmatched observations by pass id) regardless of input order.
pub fn merge(predictions: &[PredictedPass], observations: &[ObservationRecord]) -> Merged {
    let mut by_pass: HashMap<&str, Vec<&ObservationRecord>> = HashMap::new();
    for observation in observations {
        by_pass
            .entry(observation.pass_id.as_str())
            .or_default()
            .push(observation);
    }

    let mut ordered: Vec<&PredictedPass> = predictions.iter().collect();
    ordered.sort_by(|a, b| {
        a.rise_time
            .cmp(&b.rise_time)
            .then_with(|| a.pass_id.cmp(&b.pass_id))
    });

    let mut merged = Merged::default();

    for prediction in ordered {
        let Some(matches) = by_pass.get_mut(prediction.pass_id.as_str()) else {
            merged.records.push(MergedRecord {
                pass_id: prediction.pass_id.clone(),
                prediction: Some(prediction.clone()),
                observation: None,
                status: MatchStatus::NotYetObserved,
            });
            continue;
        };

        if matches.len() > 1 {
            merged.warnings.push(DataQualityWarning::DuplicateObservation {
                pass_id: prediction.pass_id.clone(),
                count: matches.len(),
            });
        }

        matches.sort_by(|a, b| observation_order(a, b));
        for observation in matches.iter() {
            merged.records.push(MergedRecord {
                pass_id: prediction.pass_id.clone(),
                prediction: Some(prediction.clone()),
                observation: Some((*observation).clone()),
                status: MatchStatus::Observed,
            });
        }
    }

    let known: HashSet<&str> = predictions.iter().map(|p| p.pass_id.as_str()).collect();
    let mut unmatched: Vec<&ObservationRecord> = observations
        .iter()
        .filter(|o| !known.contains(o.pass_id.as_str()))
        .collect();
    unmatched.sort_by(|a, b| observation_order(a, b));

    for observation in unmatched {
        merged
            .warnings
            .push(DataQualityWarning::UnmatchedObservation {
                pass_id: observation.pass_id.clone(),
            });
        merged.records.push(MergedRecord {
            pass_id: observation.pass_id.clone(),
            prediction: None,
            observation: Some(observation.clone()),
            status: MatchStatus::Unmatched,
        });
    }

    for warning in &merged.warnings {
        log::warn!("{}", warning);
    }

    merged
}

fn observation_order(a: &ObservationRecord, b: &ObservationRecord) -> Ordering {
    a.pass_id
        .cmp(&b.pass_id)
        .then_with(|| a.observed_at.cmp(&b.observed_at))
        .then_with(|| a.success.cmp(&b.success))
        .then_with(|| a.weather.cmp(&b.weather))
        .then_with(|| a.notes.cmp(&b.notes))
        .then_with(|| {
            a.actual_altitude
                .partial_cmp(&b.actual_altitude)
                .unwrap_or(Ordering::Equal)
        })
}
