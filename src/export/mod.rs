use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::observations::{MatchStatus, MergedRecord, ObservationRecord, Weather};
use crate::predict::{PredictedPass, Visibility};

pub const PREDICTION_COLUMNS: &[&str] = &[
    "pass_id",
    "rise_time",
    "peak_time",
    "set_time",
    "peak_altitude",
    "azimuth",
    "magnitude",
    "duration_minutes",
    "range_km",
    "sun_altitude",
    "visibility",
];

pub const OBSERVATION_COLUMNS: &[&str] = &[
    "pass_id",
    "success",
    "weather",
    "notes",
    "observed_at",
    "actual_altitude",
];

pub const MERGED_COLUMNS: &[&str] = &[
    "pass_id",
    "rise_time",
    "peak_time",
    "set_time",
    "peak_altitude",
    "azimuth",
    "magnitude",
    "duration_minutes",
    "range_km",
    "sun_altitude",
    "visibility",
    "success",
    "weather",
    "notes",
    "observed_at",
    "actual_altitude",
    "status",
    "altitude_error",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error on {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("CSV error in {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

impl ExportError {
    fn io(path: &Path, source: io::Error) -> Self {
        ExportError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        ExportError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One line of the merged CSV.
#[derive(Debug, Serialize)]
struct MergedRow<'a> {
    pass_id: &'a str,
    rise_time: Option<DateTime<Utc>>,
    peak_time: Option<DateTime<Utc>>,
    set_time: Option<DateTime<Utc>>,
    peak_altitude: Option<f64>,
    azimuth: Option<f64>,
    magnitude: Option<f64>,
    duration_minutes: Option<f64>,
    range_km: Option<f64>,
    sun_altitude: Option<f64>,
    visibility: Option<Visibility>,
    success: Option<bool>,
    weather: Option<Weather>,
    notes: Option<&'a str>,
    observed_at: Option<DateTime<Utc>>,
    actual_altitude: Option<f64>,
    status: MatchStatus,
    altitude_error: Option<f64>,
}

impl<'a> From<&'a MergedRecord> for MergedRow<'a> {
    fn from(record: &'a MergedRecord) -> Self {
        let p = record.prediction.as_ref();
        let o = record.observation.as_ref();
        MergedRow {
            pass_id: &record.pass_id,
            rise_time: p.map(|p| p.rise_time),
            peak_time: p.map(|p| p.peak_time),
            set_time: p.map(|p| p.set_time),
            peak_altitude: p.map(|p| p.peak_altitude),
            azimuth: p.map(|p| p.azimuth),
            magnitude: p.map(|p| p.magnitude),
            duration_minutes: p.map(|p| p.duration_minutes),
            range_km: p.map(|p| p.range_km),
            sun_altitude: p.map(|p| p.sun_altitude),
            visibility: p.map(|p| p.visibility),
            success: o.map(|o| o.success),
            weather: o.map(|o| o.weather),
            notes: o.map(|o| o.notes.as_str()),
            observed_at: o.and_then(|o| o.observed_at),
            actual_altitude: o.and_then(|o| o.actual_altitude),
            status: record.status,
            altitude_error: record.altitude_error(),
        }
    }
}

pub fn write_predictions(path: &Path, passes: &[PredictedPass]) -> Result<(), ExportError> {
    write_rows(path, PREDICTION_COLUMNS, passes)?;
    log::info!("Wrote {} predictions to {}", passes.len(), path.display());
    Ok(())
}

pub fn read_predictions(path: &Path) -> Result<Vec<PredictedPass>, ExportError> {
    read_rows(path)
}

pub fn write_observations(
    path: &Path,
    observations: &[ObservationRecord],
) -> Result<(), ExportError> {
    write_rows(path, OBSERVATION_COLUMNS, observations)
}

/// Observations on disk; a missing file means nothing was logged yet.
pub fn read_observations(path: &Path) -> Result<Vec<ObservationRecord>, ExportError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    read_rows(path)
}

/// Append by rewriting the whole file. Returns the full log.
pub fn append_observation(
    path: &Path,
    observation: ObservationRecord,
) -> Result<Vec<ObservationRecord>, ExportError> {
    let mut observations = read_observations(path)?;
    observations.push(observation);
    write_observations(path, &observations)?;
    Ok(observations)
}

pub fn write_merged(path: &Path, records: &[MergedRecord]) -> Result<(), ExportError> {
    let rows: Vec<MergedRow> = records.iter().map(MergedRow::from).collect();
    write_rows(path, MERGED_COLUMNS, &rows)?;
    log::info!("Wrote {} merged rows to {}", rows.len(), path.display());
    Ok(())
}

/// Serialize to a sibling temp file, then rename over `path`. The temp file
/// never outlives a failed write.
fn write_rows<T: Serialize>(path: &Path, columns: &[&str], rows: &[T]) -> Result<(), ExportError> {
    let tmp = temp_path(path);
    let result = write_csv(&tmp, path, columns, rows)
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| ExportError::io(path, e)));
    if result.is_err() && tmp.exists() {
        if let Err(e) = fs::remove_file(&tmp) {
            log::warn!("Failed to remove {}: {}", tmp.display(), e);
        }
    }
    result
}

fn write_csv<T: Serialize>(
    tmp: &Path,
    path: &Path,
    columns: &[&str],
    rows: &[T],
) -> Result<(), ExportError> {
    let file = fs::File::create(tmp).map_err(|e| ExportError::io(tmp, e))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(columns)
        .map_err(|e| ExportError::csv(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| ExportError::csv(path, e))?;
    }
    writer.flush().map_err(|e| ExportError::io(tmp, e))
}

/// Unique per write so concurrent writers never share a temp file.
fn temp_path(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    path.with_extension(format!("csv.{}-{}.tmp", std::process::id(), n))
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ExportError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| ExportError::csv(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| ExportError::csv(path, e))
}
