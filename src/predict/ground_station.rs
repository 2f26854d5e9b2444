use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::error::GeometryError;

/// Lowest elevation accepted for an observer, just under the Dead Sea shore.
pub const ELEVATION_FLOOR_M: f64 = -500.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ObserverLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub elevation_m: f64,
}

impl Default for ObserverLocation {
    /// Columbus, Ohio.
    fn default() -> Self {
        Self {
            latitude_deg: 39.9612,
            longitude_deg: -82.9988,
            elevation_m: 275.0,
        }
    }
}

impl ObserverLocation {
    pub fn new(latitude_deg: f64, longitude_deg: f64, elevation_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            elevation_m,
        }
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        if !self.latitude_deg.is_finite() || !(-90.0..=90.0).contains(&self.latitude_deg) {
            return Err(GeometryError::Latitude(self.latitude_deg));
        }
        if !self.longitude_deg.is_finite() || !(-180.0..=180.0).contains(&self.longitude_deg) {
            return Err(GeometryError::Longitude(self.longitude_deg));
        }
        if !self.elevation_m.is_finite() || self.elevation_m < ELEVATION_FLOOR_M {
            return Err(GeometryError::Elevation {
                elevation_m: self.elevation_m,
                floor_m: ELEVATION_FLOOR_M,
            });
        }
        Ok(())
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        // WGS-84 constants
        let a = 6378.137;
        let e2 = 0.00669437999014;
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let alt_km = self.elevation_m / 1000.0;
        let x = (n + alt_km) * cos_lat * lon.cos();
        let y = (n + alt_km) * cos_lat * lon.sin();
        let z = (n * (1.0 - e2) + alt_km) * sin_lat;
        [x, y, z]
    }
}
