use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::export;
use crate::predict::{HttpTleSource, PredictedPass, TleCache, TleSource};

pub type SharedTleSource = Box<dyn TleSource + Send>;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tle_cache: Arc<StdMutex<TleCache<SharedTleSource>>>,
    pub predictions: Arc<RwLock<Vec<PredictedPass>>>,
    /// Held across every read-modify-write of the observations CSV.
    pub observation_log: Arc<StdMutex<()>>,
}

impl AppState {
    /// Seeds predictions from the last export so analytics survive a restart.
    pub fn new(config: Config) -> Self {
        let source = HttpTleSource::new(config.tle.catalog_url.clone());
        Self::with_source(config, Box::new(source))
    }

    pub fn with_source(config: Config, source: SharedTleSource) -> Self {
        let cache = config.tle.cache(source);

        let predictions = if config.output.predictions.exists() {
            match export::read_predictions(&config.output.predictions) {
                Ok(passes) => {
                    log::info!(
                        "Loaded {} predictions from {}",
                        passes.len(),
                        config.output.predictions.display()
                    );
                    passes
                }
                Err(e) => {
                    log::warn!("Failed to load previous predictions: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Self {
            config: Arc::new(config),
            tle_cache: Arc::new(StdMutex::new(cache)),
            predictions: Arc::new(RwLock::new(predictions)),
            observation_log: Arc::new(StdMutex::new(())),
        }
    }
}
