use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc};
use practical_astronomy_rust::sun as pa_sun;

use crate::predict::propagation::{dot, ecef_to_enu, norm, teme_to_ecef_position, LookAngles};
use crate::predict::types::Visibility;
use crate::predict::ObserverLocation;

const EARTH_RADIUS_KM: f64 = 6378.137;

/// ISS brightness at 1000 km range and 90 degree phase angle.
pub const ISS_STANDARD_MAGNITUDE: f64 = -1.8;

/// Sun altitude above which the sky is too bright to see the station.
pub const CIVIL_TWILIGHT_DEG: f64 = -6.0;

#[derive(Debug, Clone, Copy)]
pub struct Illumination {
    pub sun_altitude_deg: f64,
    pub magnitude: f64,
    pub visibility: Visibility,
}

/// Unit vector towards the Sun in the equatorial frame of date.
pub fn sun_direction_equatorial(timestamp: DateTime<Utc>) -> [f64; 3] {
    let (ra_deg, dec_deg) = sun_ra_dec_deg(timestamp);
    let (ra, dec) = (ra_deg.to_radians(), dec_deg.to_radians());
    [dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin()]
}

/// Apparent right ascension and declination of the Sun, degrees.
fn sun_ra_dec_deg(timestamp: DateTime<Utc>) -> (f64, f64) {
    let seconds =
        f64::from(timestamp.second()) + f64::from(timestamp.timestamp_subsec_micros()) / 1.0e6;
    let (ra_h, ra_m, ra_s, dec_d, dec_m, dec_s) = pa_sun::precise_position_of_sun(
        f64::from(timestamp.hour()),
        f64::from(timestamp.minute()),
        seconds,
        f64::from(timestamp.day()),
        timestamp.month(),
        timestamp.year() as u32,
        false,
        0,
    );
    (hms_to_deg(ra_h, ra_m, ra_s), dms_to_deg(dec_d, dec_m, dec_s))
}

fn hms_to_deg(h: f64, m: f64, s: f64) -> f64 {
    (h + m / 60.0 + s / 3600.0) * 15.0
}

// Degrees carry the sign, including -0 for declinations just south of the equator.
fn dms_to_deg(d: f64, m: f64, s: f64) -> f64 {
    let sign = if d.is_sign_negative() { -1.0 } else { 1.0 };
    sign * (d.abs() + m / 60.0 + s / 3600.0)
}

/// Lighting of the satellite and of the observer's sky at one sample.
pub fn illumination(location: &ObserverLocation, look: &LookAngles) -> Illumination {
    let sun = teme_to_ecef_position(sun_direction_equatorial(look.timestamp), look.sidereal_rad);

    let (_, _, up) = ecef_to_enu(sun, location.lat_rad(), location.lon_rad());
    let sun_altitude_deg = up.clamp(-1.0, 1.0).asin().to_degrees();

    let sat = look.satellite_ecef_km;
    let sunlit = !in_earth_shadow(sat, sun);

    let obs = location.position_ecef_km();
    let to_observer = [obs[0] - sat[0], obs[1] - sat[1], obs[2] - sat[2]];
    let phase_angle = if look.range_km > 0.0 {
        (dot(sun, to_observer) / look.range_km)
            .clamp(-1.0, 1.0)
            .acos()
    } else {
        0.0
    };

    let visibility = if sun_altitude_deg >= CIVIL_TWILIGHT_DEG {
        Visibility::Daylight
    } else if sunlit {
        Visibility::Visible
    } else {
        Visibility::Eclipsed
    };

    Illumination {
        sun_altitude_deg,
        magnitude: estimate_magnitude(look.range_km, phase_angle),
        visibility,
    }
}

/// Cylindrical shadow model; `sun` must be a unit vector.
pub fn in_earth_shadow(position_km: [f64; 3], sun: [f64; 3]) -> bool {
    let along = dot(position_km, sun);
    if along >= 0.0 {
        return false;
    }
    let perpendicular = [
        position_km[0] - along * sun[0],
        position_km[1] - along * sun[1],
        position_km[2] - along * sun[2],
    ];
    norm(perpendicular) < EARTH_RADIUS_KM
}

/// Apparent magnitude of a diffusely reflecting sphere.
pub fn estimate_magnitude(range_km: f64, phase_angle_rad: f64) -> f64 {
    let phase = (PI - phase_angle_rad) * phase_angle_rad.cos() + phase_angle_rad.sin();
    let magnitude = ISS_STANDARD_MAGNITUDE + 5.0 * (range_km / 1000.0).log10()
        - 2.5 * phase.max(1e-6).log10();
    round2(magnitude)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn declination_deg(timestamp: DateTime<Utc>) -> f64 {
        sun_direction_equatorial(timestamp)[2].asin().to_degrees()
    }

    #[test]
    fn sun_declination_at_solstices() {
        let december = Utc.with_ymd_and_hms(2025, 12, 21, 12, 0, 0).unwrap();
        let june = Utc.with_ymd_and_hms(2025, 6, 21, 12, 0, 0).unwrap();
        assert!((declination_deg(december) + 23.44).abs() < 0.1);
        assert!((declination_deg(june) - 23.44).abs() < 0.1);
    }

    #[test]
    fn sun_near_equator_at_equinox() {
        let march = Utc.with_ymd_and_hms(2025, 3, 20, 9, 0, 0).unwrap();
        assert!(declination_deg(march).abs() < 0.2);
    }

    #[test]
    fn small_southern_declination_keeps_sign() {
        assert_eq!(dms_to_deg(-0.0, 30.0, 0.0), -0.5);
        assert!((dms_to_deg(-23.0, 26.0, 24.0) + 23.44).abs() < 1e-9);
        assert_eq!(hms_to_deg(6.0, 0.0, 0.0), 90.0);
    }

    #[test]
    fn sun_direction_is_unit_length() {
        let t = Utc.with_ymd_and_hms(2025, 10, 5, 0, 0, 0).unwrap();
        assert!((norm(sun_direction_equatorial(t)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn shadow_is_behind_earth_only() {
        let sun = [1.0, 0.0, 0.0];
        assert!(in_earth_shadow([-6800.0, 0.0, 0.0], sun));
        assert!(!in_earth_shadow([6800.0, 0.0, 0.0], sun));
        assert!(!in_earth_shadow([-6800.0, 0.0, 6500.0], sun));
    }

    #[test]
    fn standard_magnitude_at_reference_geometry() {
        assert_eq!(estimate_magnitude(1000.0, PI / 2.0), ISS_STANDARD_MAGNITUDE);
    }

    #[test]
    fn closer_and_fuller_is_brighter() {
        let far = estimate_magnitude(2000.0, 1.0);
        let near = estimate_magnitude(500.0, 1.0);
        assert!(near < far);

        let full = estimate_magnitude(1000.0, 0.2);
        let crescent = estimate_magnitude(1000.0, 2.8);
        assert!(full < crescent);
    }
}
