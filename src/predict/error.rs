use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("expected 2 or 3 TLE lines, got {0}")]
    LineCount(usize),
    #[error("TLE line {line} is {length} characters, expected 69")]
    LineLength { line: u8, length: usize },
    #[error("TLE line {line} checksum mismatch: expected {expected}, computed {computed}")]
    Checksum { line: u8, expected: u32, computed: u32 },
    #[error("invalid tle: {0}")]
    InvalidTle(#[from] sgp4::TleError),
    #[error("cache file error: {0}")]
    CacheFile(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),
    #[error("elevation {elevation_m} m below floor of {floor_m} m")]
    Elevation { elevation_m: f64, floor_m: f64 },
}

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("{0}")]
    Geometry(#[from] GeometryError),
    #[error("invalid search: {0}")]
    InvalidSearch(String),
    #[error("elements error: {0}")]
    Elements(#[from] sgp4::ElementsError),
    #[error("Propagation error: {0}")]
    Propagation(String),
}
