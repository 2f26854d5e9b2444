pub mod analytics;
pub mod error;
pub mod observations;
pub mod predict;

use error::{ApiError, ApiResult};

/// Run file or network I/O on the blocking pool.
pub(crate) async fn run_blocking<T, F>(task: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use crate::config::Config;
    use crate::predict::{StaticSource, ISS_TLE};
    use crate::web::state::{AppState, SharedTleSource};

    /// Config whose files all live under `dir`.
    pub fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.tle.cache_file = Some(dir.join("iss_tle.yaml"));
        config.output.predictions = dir.join("iss_predictions.csv");
        config.output.observations = dir.join("iss_observations.csv");
        config.output.merged = dir.join("iss_full_data.csv");
        config
    }

    pub fn state_in(dir: &Path) -> AppState {
        state_with_source(dir, Box::new(StaticSource::new(ISS_TLE)))
    }

    pub fn state_with_source(dir: &Path, source: SharedTleSource) -> AppState {
        AppState::with_source(config_in(dir), source)
    }
}
