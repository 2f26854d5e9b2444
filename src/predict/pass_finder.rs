use chrono::{DateTime, Duration, Utc};
use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;
use crate::predict::propagation::{propagate_look_angles, LookAngles};
use crate::predict::sun::illumination;
use crate::predict::types::{OrbitalElements, PredictedPass};
use crate::predict::ObserverLocation;

pub const DEFAULT_STEP: Duration = Duration::seconds(10);
pub const DEFAULT_MIN_ALTITUDE_DEG: f64 = 10.0;

/// Time window and sampling of a pass search over `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassSearch {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub step: Duration,
    pub min_altitude_deg: f64,
}

impl PassSearch {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
        min_altitude_deg: f64,
    ) -> Self {
        Self {
            start,
            end,
            step,
            min_altitude_deg,
        }
    }

    pub fn days_ahead(start: DateTime<Utc>, days: u32, step: Duration, min_altitude_deg: f64) -> Self {
        Self::new(start, start + Duration::days(i64::from(days)), step, min_altitude_deg)
    }

    pub fn validate(&self) -> Result<(), PredictError> {
        if self.end <= self.start {
            return Err(PredictError::InvalidSearch(format!(
                "window end {} is not after start {}",
                self.end, self.start
            )));
        }
        if self.step <= Duration::zero() {
            return Err(PredictError::InvalidSearch(format!(
                "step must be positive, got {}s",
                self.step.num_seconds()
            )));
        }
        if !(0.0..90.0).contains(&self.min_altitude_deg) {
            return Err(PredictError::InvalidSearch(format!(
                "minimum altitude {} outside [0, 90)",
                self.min_altitude_deg
            )));
        }
        Ok(())
    }
}

/// Stable identifier of a pass, derived from its rise time alone.
pub fn pass_id(rise_time: DateTime<Utc>) -> String {
    rise_time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Start a lazy pass search.
///
/// Each pass is a maximal run of consecutive ticks (`start + k * step`) at or
/// above the minimum altitude. Rise and set are the first and last visible
/// ticks, so boundary times are only accurate to one step; no interpolation
/// is attempted. The peak is the highest tick of the run, earliest on ties.
pub fn find_passes<'a>(
    elements: &'a OrbitalElements,
    location: ObserverLocation,
    search: PassSearch,
) -> Result<Passes<'a>, PredictError> {
    location.validate()?;
    search.validate()?;
    let constants = Constants::from_elements(&elements.elements)?;

    log::debug!(
        "Searching passes from {} to {} every {}s above {} deg",
        search.start,
        search.end,
        search.step.num_seconds(),
        search.min_altitude_deg
    );

    Ok(Passes {
        elements: &elements.elements,
        constants,
        location,
        search,
        cursor: search.start,
        failed: false,
    })
}

/// Iterator over the passes of one search, see [`find_passes`].
pub struct Passes<'a> {
    elements: &'a Elements,
    constants: Constants,
    location: ObserverLocation,
    search: PassSearch,
    cursor: DateTime<Utc>,
    failed: bool,
}

impl Passes<'_> {
    /// Rewind to the start of the window.
    pub fn restart(&mut self) {
        self.cursor = self.search.start;
        self.failed = false;
    }

    fn summarize(&self, run: Run) -> PredictedPass {
        let light = illumination(&self.location, &run.peak);
        let duration = run.set - run.rise;

        PredictedPass {
            pass_id: pass_id(run.rise),
            rise_time: run.rise,
            peak_time: run.peak.timestamp,
            set_time: run.set,
            peak_altitude: run.peak.elevation_deg,
            azimuth: run.peak.azimuth_deg,
            magnitude: light.magnitude,
            duration_minutes: (duration.num_seconds() as f64 / 6.0).round() / 10.0,
            range_km: run.peak.range_km,
            sun_altitude: light.sun_altitude_deg,
            visibility: light.visibility,
        }
    }
}

impl Iterator for Passes<'_> {
    type Item = Result<PredictedPass, PredictError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let mut tracker = RunTracker::new(self.search.min_altitude_deg);
        while self.cursor < self.search.end {
            let look = match propagate_look_angles(
                &self.location,
                self.elements,
                &self.constants,
                self.cursor,
            ) {
                Ok(look) => look,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };
            self.cursor += self.search.step;

            if let Some(run) = tracker.push(look) {
                return Some(Ok(self.summarize(run)));
            }
        }

        tracker.finish().map(|run| Ok(self.summarize(run)))
    }
}

/// One contiguous run of visible ticks.
#[derive(Debug, Clone, Copy)]
struct Run {
    rise: DateTime<Utc>,
    set: DateTime<Utc>,
    peak: LookAngles,
}

struct RunTracker {
    min_altitude_deg: f64,
    current: Option<Run>,
}

impl RunTracker {
    fn new(min_altitude_deg: f64) -> Self {
        Self {
            min_altitude_deg,
            current: None,
        }
    }

    /// Feed the next tick; returns a run once it has ended.
    fn push(&mut self, look: LookAngles) -> Option<Run> {
        if look.elevation_deg < self.min_altitude_deg {
            return self.current.take();
        }

        match &mut self.current {
            Some(run) => {
                run.set = look.timestamp;
                if look.elevation_deg > run.peak.elevation_deg {
                    run.peak = look;
                }
            }
            None => {
                self.current = Some(Run {
                    rise: look.timestamp,
                    set: look.timestamp,
                    peak: look,
                });
            }
        }
        None
    }

    /// A run still open at the end of the window ends at the last tick.
    fn finish(&mut self) -> Option<Run> {
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::error::GeometryError;
    use crate::predict::tle_cache::tests::iss_elements;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 5, 12, 0, 0).unwrap()
    }

    fn columbus() -> ObserverLocation {
        ObserverLocation::new(39.9612, -82.9988, 275.0)
    }

    fn look(seconds: i64, elevation_deg: f64) -> LookAngles {
        LookAngles {
            timestamp: t0() + Duration::seconds(seconds),
            azimuth_deg: 180.0,
            elevation_deg,
            range_km: 800.0,
            satellite_ecef_km: [0.0, 0.0, 7000.0],
            sidereal_rad: 0.0,
        }
    }

    fn collect(
        elements: &OrbitalElements,
        location: ObserverLocation,
        search: PassSearch,
    ) -> Vec<PredictedPass> {
        find_passes(elements, location, search)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn pass_id_is_compact_utc_timestamp() {
        let rise = Utc.with_ymd_and_hms(2025, 10, 5, 21, 13, 40).unwrap();
        assert_eq!(pass_id(rise), "20251005T211340Z");
    }

    #[test]
    fn run_tracker_splits_on_horizon() {
        let mut tracker = RunTracker::new(10.0);
        assert!(tracker.push(look(0, 5.0)).is_none());
        assert!(tracker.push(look(10, 12.0)).is_none());
        assert!(tracker.push(look(20, 40.0)).is_none());
        assert!(tracker.push(look(30, 15.0)).is_none());

        let run = tracker.push(look(40, 9.9)).unwrap();
        assert_eq!(run.rise, t0() + Duration::seconds(10));
        assert_eq!(run.peak.timestamp, t0() + Duration::seconds(20));
        assert_eq!(run.set, t0() + Duration::seconds(30));
        assert!(tracker.finish().is_none());
    }

    #[test]
    fn single_tick_run_is_a_pass() {
        let mut tracker = RunTracker::new(10.0);
        tracker.push(look(0, 3.0));
        tracker.push(look(10, 10.0));
        let run = tracker.push(look(20, 3.0)).unwrap();
        assert_eq!(run.rise, run.set);
        assert_eq!(run.rise, run.peak.timestamp);
    }

    #[test]
    fn peak_ties_keep_earliest_tick() {
        let mut tracker = RunTracker::new(0.0);
        tracker.push(look(0, 20.0));
        tracker.push(look(10, 30.0));
        tracker.push(look(20, 30.0));
        let run = tracker.finish().unwrap();
        assert_eq!(run.peak.timestamp, t0() + Duration::seconds(10));
        assert_eq!(run.set, t0() + Duration::seconds(20));
    }

    #[test]
    fn passes_respect_invariants() {
        let elements = iss_elements();
        let search = PassSearch::days_ahead(t0(), 3, DEFAULT_STEP, DEFAULT_MIN_ALTITUDE_DEG);
        let passes = collect(&elements, columbus(), search);

        assert!(!passes.is_empty());
        for pass in &passes {
            assert!(pass.rise_time <= pass.peak_time);
            assert!(pass.peak_time <= pass.set_time);
            assert!(pass.peak_altitude >= DEFAULT_MIN_ALTITUDE_DEG);
            assert!(pass.peak_altitude <= 90.0);
            assert!((0.0..360.0).contains(&pass.azimuth));
            assert!(pass.rise_time >= search.start && pass.set_time < search.end);
            assert_eq!(pass.pass_id, pass_id(pass.rise_time));
        }
        for pair in passes.windows(2) {
            assert!(pair[0].set_time < pair[1].rise_time);
        }
    }

    #[test]
    fn week_long_search_is_reproducible() {
        let elements = iss_elements();
        let search = PassSearch::days_ahead(t0(), 7, DEFAULT_STEP, 10.0);

        let first = collect(&elements, columbus(), search);
        let second = collect(&elements, columbus(), search);

        assert_eq!(first, second);
    }

    #[test]
    fn restart_replays_the_same_sequence() {
        let elements = iss_elements();
        let search = PassSearch::days_ahead(t0(), 1, Duration::seconds(30), 0.0);
        let mut passes = find_passes(&elements, columbus(), search).unwrap();

        let first: Vec<_> = passes.by_ref().map(|p| p.unwrap().pass_id).collect();
        assert!(passes.next().is_none());
        passes.restart();
        let second: Vec<_> = passes.map(|p| p.unwrap().pass_id).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn higher_threshold_yields_subset() {
        let elements = iss_elements();
        let low = collect(
            &elements,
            columbus(),
            PassSearch::days_ahead(t0(), 2, DEFAULT_STEP, 10.0),
        );
        let high = collect(
            &elements,
            columbus(),
            PassSearch::days_ahead(t0(), 2, DEFAULT_STEP, 40.0),
        );

        assert!(high.len() <= low.len());
        for pass in &high {
            assert!(low
                .iter()
                .any(|p| p.rise_time <= pass.rise_time && pass.set_time <= p.set_time));
        }
    }

    #[test]
    fn rejects_invalid_location() {
        let elements = iss_elements();
        let search = PassSearch::days_ahead(t0(), 1, DEFAULT_STEP, 10.0);
        let result = find_passes(&elements, ObserverLocation::new(95.0, 0.0, 0.0), search);
        assert!(matches!(
            result,
            Err(PredictError::Geometry(GeometryError::Latitude(_)))
        ));
    }

    #[test]
    fn rejects_invalid_search() {
        let elements = iss_elements();
        let backwards = PassSearch::new(t0(), t0() - Duration::hours(1), DEFAULT_STEP, 10.0);
        let zero_step = PassSearch::days_ahead(t0(), 1, Duration::zero(), 10.0);
        let overhead = PassSearch::days_ahead(t0(), 1, DEFAULT_STEP, 90.0);

        for search in [backwards, zero_step, overhead] {
            assert!(matches!(
                find_passes(&elements, columbus(), search),
                Err(PredictError::InvalidSearch(_))
            ));
        }
    }
}
