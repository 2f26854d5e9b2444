mod error;
mod ground_station;
mod pass_finder;
mod propagation;
mod sun;
mod tle_cache;
mod types;

pub use error::{FetchError, GeometryError, PredictError};
pub use ground_station::ObserverLocation;
pub use pass_finder::{
    find_passes, pass_id, PassSearch, Passes, DEFAULT_MIN_ALTITUDE_DEG, DEFAULT_STEP,
};
pub use tle_cache::{
    parse_tle, HttpTleSource, TleCache, TleSource, DEFAULT_CATALOG_URL, DEFAULT_MAX_AGE,
    ISS_NORAD_ID,
};
pub use types::{OrbitalElements, PredictedPass, Visibility};

#[cfg(test)]
pub(crate) use tle_cache::tests::{iss_elements, StaticSource, Unreachable, ISS_TLE};

/// Passes peaking at or above `threshold_deg`, in their original order.
pub fn best_passes(passes: &[PredictedPass], threshold_deg: f64) -> Vec<PredictedPass> {
    passes
        .iter()
        .filter(|p| p.peak_altitude >= threshold_deg)
        .cloned()
        .collect()
}
