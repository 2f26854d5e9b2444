//! The predict → log → merge sequence, callable from the CLI, the web API
//! or tests with explicit parameters.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::export::ExportError;
use crate::observations::{
    accuracy_report, merge, AccuracyReport, DataQualityWarning, MergedRecord, ObservationRecord,
};
use crate::predict::{
    find_passes, FetchError, ObserverLocation, PassSearch, PredictError, PredictedPass, TleCache,
    TleSource,
};
use crate::report::{passes_per_day, OutcomeBreakdown};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("TLE fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Predict(#[from] PredictError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

/// Fetch (or reuse) elements and run one pass search to completion.
pub fn predict_passes<S: TleSource>(
    cache: &mut TleCache<S>,
    max_age: Duration,
    location: ObserverLocation,
    search: PassSearch,
) -> Result<Vec<PredictedPass>, PipelineError> {
    location.validate().map_err(PredictError::from)?;
    let elements = cache.get_elements(max_age)?;
    let passes = find_passes(elements, location, search)?.collect::<Result<Vec<_>, _>>()?;

    log::info!(
        "Found {} passes between {} and {} above {} deg",
        passes.len(),
        search.start,
        search.end,
        search.min_altitude_deg
    );
    Ok(passes)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Analytics {
    pub accuracy: AccuracyReport,
    pub outcomes: OutcomeBreakdown,
    pub passes_per_day: BTreeMap<NaiveDate, usize>,
    pub warnings: Vec<DataQualityWarning>,
    #[serde(skip)]
    pub merged: Vec<MergedRecord>,
}

pub fn analyze(predictions: &[PredictedPass], observations: &[ObservationRecord]) -> Analytics {
    let merged = merge(predictions, observations);
    let accuracy = accuracy_report(&merged.records);

    Analytics {
        outcomes: OutcomeBreakdown::from(&accuracy.overall),
        accuracy,
        passes_per_day: passes_per_day(predictions),
        warnings: merged.warnings,
        merged: merged.records,
    }
}
