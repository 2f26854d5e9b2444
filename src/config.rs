use chrono::Duration;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use thiserror::Error;

use crate::predict::{
    ObserverLocation, TleCache, TleSource, DEFAULT_CATALOG_URL, DEFAULT_MAX_AGE,
    DEFAULT_MIN_ALTITUDE_DEG, DEFAULT_STEP, ISS_NORAD_ID,
};

pub const MAX_DAYS: u32 = 14;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub observer: ObserverLocation,
    pub prediction: PredictionConfig,
    pub tle: TleConfig,
    pub output: OutputConfig,
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub days: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub step: Duration,
    pub min_altitude_deg: f64,
    pub best_threshold_deg: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            days: 7,
            step: DEFAULT_STEP,
            min_altitude_deg: DEFAULT_MIN_ALTITUDE_DEG,
            best_threshold_deg: 30.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TleConfig {
    pub catalog_url: String,
    pub norad_id: u64,
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_age: Duration,
    pub cache_file: Option<PathBuf>,
}

impl Default for TleConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            norad_id: ISS_NORAD_ID,
            max_age: DEFAULT_MAX_AGE,
            cache_file: Some(PathBuf::from("iss_tle.yaml")),
        }
    }
}

impl TleConfig {
    /// A cache for the configured satellite, backed by `cache_file` when set.
    pub fn cache<S: TleSource>(&self, source: S) -> TleCache<S> {
        let cache = TleCache::new(source, self.norad_id);
        match &self.cache_file {
            Some(path) => cache.with_cache_file(path.clone()),
            None => cache,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub predictions: PathBuf,
    pub observations: PathBuf,
    pub merged: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            predictions: PathBuf::from("iss_predictions.csv"),
            observations: PathBuf::from("iss_observations.csv"),
            merged: PathBuf::from("iss_full_data.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let duration = humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)?;
    Duration::from_std(duration)
        .map_err(|_| serde::de::Error::custom(format!("duration {} is out of range", s.trim())))
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let prediction = &self.prediction;
        validate_days(prediction.days)?;
        if prediction.step <= Duration::zero() {
            return Err(ConfigError::Invalid("prediction.step must be positive".into()));
        }
        if prediction.step > Duration::days(i64::from(prediction.days)) {
            return Err(ConfigError::Invalid(format!(
                "prediction.step {}s is longer than the {} day window",
                prediction.step.num_seconds(),
                prediction.days
            )));
        }
        validate_min_altitude(prediction.min_altitude_deg)?;
        if !(0.0..=90.0).contains(&prediction.best_threshold_deg) {
            return Err(ConfigError::Invalid(format!(
                "prediction.best_threshold_deg {} outside [0, 90]",
                prediction.best_threshold_deg
            )));
        }
        self.observer
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("observer: {}", e)))
    }
}

fn validate_min_altitude(min_altitude_deg: f64) -> Result<(), ConfigError> {
    if !(0.0..90.0).contains(&min_altitude_deg) {
        return Err(ConfigError::Invalid(format!(
            "minimum altitude {} outside [0, 90)",
            min_altitude_deg
        )));
    }
    Ok(())
}

pub fn validate_days(days: u32) -> Result<(), ConfigError> {
    if !(1..=MAX_DAYS).contains(&days) {
        return Err(ConfigError::Invalid(format!(
            "prediction window must be 1 to {} days, got {}",
            MAX_DAYS, days
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::{StaticSource, ISS_TLE};

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_str("{}").unwrap();
        assert_eq!(config.observer, ObserverLocation::default());
        assert_eq!(config.prediction.days, 7);
        assert_eq!(config.prediction.step, Duration::seconds(10));
        assert_eq!(config.tle.max_age, Duration::hours(1));
        assert_eq!(config.tle.cache_file, Some(PathBuf::from("iss_tle.yaml")));
        assert_eq!(config.tle.norad_id, 25544);
        assert_eq!(config.web.bind, "127.0.0.1:8080");
    }

    #[test]
    fn parses_full_config() {
        let yaml = r#"
observer:
  latitude_deg: 48.8566
  longitude_deg: 2.3522
  elevation_m: 35
prediction:
  days: 3
  step: 30s
  min_altitude_deg: 15
tle:
  max_age: 2h
  cache_file: /tmp/iss.yaml
output:
  predictions: out/p.csv
"#;
        let config = Config::from_str(yaml).unwrap();
        assert_eq!(config.observer, ObserverLocation::new(48.8566, 2.3522, 35.0));
        assert_eq!(config.prediction.days, 3);
        assert_eq!(config.prediction.step, Duration::seconds(30));
        assert_eq!(config.prediction.min_altitude_deg, 15.0);
        assert_eq!(config.prediction.best_threshold_deg, 30.0);
        assert_eq!(config.tle.max_age, Duration::hours(2));
        assert_eq!(config.tle.cache_file, Some(PathBuf::from("/tmp/iss.yaml")));
        assert_eq!(config.output.predictions, PathBuf::from("out/p.csv"));
        assert_eq!(
            config.output.observations,
            PathBuf::from("iss_observations.csv")
        );
    }

    #[test]
    fn rejects_out_of_range_window() {
        assert!(matches!(
            Config::from_str("prediction:\n  days: 15\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(validate_days(0).is_err());
        assert!(validate_days(14).is_ok());
    }

    #[test]
    fn rejects_bad_observer() {
        let yaml = "observer:\n  latitude_deg: 120\n  longitude_deg: 0\n";
        assert!(matches!(
            Config::from_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_bad_duration() {
        assert!(matches!(
            Config::from_str("prediction:\n  step: soon\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_duration() {
        let err = Config::from_str("tle:\n  max_age: 1000000000years\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn rejects_step_longer_than_window() {
        assert!(matches!(
            Config::from_str("prediction:\n  days: 1\n  step: 2days\n"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_altitudes() {
        for yaml in [
            "prediction:\n  min_altitude_deg: -5\n",
            "prediction:\n  min_altitude_deg: 90\n",
            "prediction:\n  best_threshold_deg: 91\n",
        ] {
            assert!(matches!(Config::from_str(yaml), Err(ConfigError::Invalid(_))));
        }
        assert!(Config::from_str("prediction:\n  best_threshold_deg: 90\n").is_ok());
    }

    #[test]
    fn default_config_reuses_elements_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        let default_file = config.tle.cache_file.clone().unwrap();
        config.tle.cache_file = Some(dir.path().join(default_file));

        let mut first = config.tle.cache(StaticSource::new(ISS_TLE));
        first.get_elements(config.tle.max_age).unwrap();
        let mut second = config.tle.cache(StaticSource::new(ISS_TLE));
        second.get_elements(config.tle.max_age).unwrap();

        assert_eq!(first.source().calls.get(), 1);
        assert_eq!(second.source().calls.get(), 0);
    }
}
