use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sgp4::Elements;

use crate::predict::error::FetchError;
use crate::predict::types::OrbitalElements;

pub const ISS_NORAD_ID: u64 = 25544;
pub const DEFAULT_CATALOG_URL: &str = "https://celestrak.org/NORAD/elements/gp.php";
pub const DEFAULT_MAX_AGE: Duration = Duration::hours(1);

/// Where raw TLE text comes from.
pub trait TleSource {
    fn fetch(&self, norad_id: u64) -> Result<String, FetchError>;
}

impl<S: TleSource + ?Sized> TleSource for Box<S> {
    fn fetch(&self, norad_id: u64) -> Result<String, FetchError> {
        (**self).fetch(norad_id)
    }
}

/// Fetches TLE text from a CelesTrak-style GP endpoint.
pub struct HttpTleSource {
    catalog_url: String,
}

impl HttpTleSource {
    pub fn new(catalog_url: impl Into<String>) -> Self {
        Self {
            catalog_url: catalog_url.into(),
        }
    }
}

impl Default for HttpTleSource {
    fn default() -> Self {
        Self::new(DEFAULT_CATALOG_URL)
    }
}

impl TleSource for HttpTleSource {
    fn fetch(&self, norad_id: u64) -> Result<String, FetchError> {
        let url = format!("{}?CATNR={}&FORMAT=TLE", self.catalog_url, norad_id);
        log::info!("Fetching TLE for NORAD {} from {}", norad_id, self.catalog_url);

        let response = reqwest::blocking::get(&url)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
        Ok(response.text()?)
    }
}

/// On-disk form of a cached element set.
#[derive(Debug, Serialize, Deserialize)]
struct CachedTle {
    name: Option<String>,
    line1: String,
    line2: String,
    fetched_at: DateTime<Utc>,
}

/// Caller-owned TLE cache: empty until the first fetch, then reused until
/// the cached set is older than the requested maximum age.
pub struct TleCache<S> {
    source: S,
    norad_id: u64,
    cache_file: Option<PathBuf>,
    cached: Option<OrbitalElements>,
}

impl<S: TleSource> TleCache<S> {
    pub fn new(source: S, norad_id: u64) -> Self {
        Self {
            source,
            norad_id,
            cache_file: None,
            cached: None,
        }
    }

    /// Persist fetched elements to `path` so later processes can reuse them.
    pub fn with_cache_file(mut self, path: PathBuf) -> Self {
        self.cache_file = Some(path);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cached(&self) -> Option<&OrbitalElements> {
        self.cached.as_ref()
    }

    pub fn get_elements(&mut self, max_age: Duration) -> Result<&OrbitalElements, FetchError> {
        self.get_elements_at(Utc::now(), max_age)
    }

    pub fn get_elements_at(
        &mut self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Result<&OrbitalElements, FetchError> {
        if self.cached.is_none() {
            self.cached = self.load_cache_file();
        }

        let elements = match self.cached.take() {
            Some(cached) if cached.age(now) < max_age => {
                log::debug!(
                    "Reusing TLE for NORAD {} fetched at {}",
                    self.norad_id,
                    cached.fetched_at
                );
                cached
            }
            _ => self.refresh(now)?,
        };

        Ok(self.cached.insert(elements))
    }

    fn refresh(&self, now: DateTime<Utc>) -> Result<OrbitalElements, FetchError> {
        let text = self.source.fetch(self.norad_id)?;
        let elements = parse_tle(&text, now)?;
        log::info!(
            "Fetched TLE for {} (epoch {})",
            elements.name.as_deref().unwrap_or("unnamed object"),
            elements.elements.datetime
        );

        if let Some(path) = &self.cache_file {
            if let Err(e) = save_cache_file(path, &elements) {
                log::warn!("Failed to write TLE cache {}: {}", path.display(), e);
            }
        }
        Ok(elements)
    }

    fn load_cache_file(&self) -> Option<OrbitalElements> {
        let path = self.cache_file.as_ref()?;
        if !path.exists() {
            return None;
        }
        match load_cache_file(path) {
            Ok(elements) if elements.norad_id() == self.norad_id => Some(elements),
            Ok(elements) => {
                log::warn!(
                    "TLE cache {} holds NORAD {}, expected {}",
                    path.display(),
                    elements.norad_id(),
                    self.norad_id
                );
                None
            }
            Err(e) => {
                log::warn!("Ignoring TLE cache {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn load_cache_file(path: &Path) -> Result<OrbitalElements, FetchError> {
    let content = fs::read_to_string(path).map_err(|e| FetchError::CacheFile(e.to_string()))?;
    let cached: CachedTle =
        serde_yaml::from_str(&content).map_err(|e| FetchError::CacheFile(e.to_string()))?;
    let text = match cached.name {
        Some(name) => format!("{}\n{}\n{}", name, cached.line1, cached.line2),
        None => format!("{}\n{}", cached.line1, cached.line2),
    };
    parse_tle(&text, cached.fetched_at)
}

fn save_cache_file(path: &Path, elements: &OrbitalElements) -> Result<(), FetchError> {
    let cached = CachedTle {
        name: elements.name.clone(),
        line1: elements.line1.clone(),
        line2: elements.line2.clone(),
        fetched_at: elements.fetched_at,
    };
    let content =
        serde_yaml::to_string(&cached).map_err(|e| FetchError::CacheFile(e.to_string()))?;
    fs::write(path, content).map_err(|e| FetchError::CacheFile(e.to_string()))
}

/// Parse a single 2- or 3-line TLE, verifying both line checksums.
pub fn parse_tle(text: &str, fetched_at: DateTime<Utc>) -> Result<OrbitalElements, FetchError> {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let (name, line1, line2) = match lines.as_slice() {
        [line1, line2] => (None, *line1, *line2),
        [name, line1, line2] => (Some(name.to_string()), *line1, *line2),
        _ => return Err(FetchError::LineCount(lines.len())),
    };

    verify_checksum(1, line1)?;
    verify_checksum(2, line2)?;

    let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())?;

    Ok(OrbitalElements {
        name,
        line1: line1.to_string(),
        line2: line2.to_string(),
        elements,
        fetched_at,
    })
}

fn verify_checksum(line: u8, text: &str) -> Result<(), FetchError> {
    let bytes = text.as_bytes();
    if bytes.len() != 69 {
        return Err(FetchError::LineLength {
            line,
            length: bytes.len(),
        });
    }

    let computed = bytes[..68]
        .iter()
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10;

    let expected = match bytes[68] {
        b @ b'0'..=b'9' => u32::from(b - b'0'),
        _ => u32::MAX,
    };

    if computed != expected {
        return Err(FetchError::Checksum {
            line,
            expected,
            computed,
        });
    }
    Ok(())
}
