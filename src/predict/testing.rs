//! Deterministic fixtures shared by unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::predict::{GroundStation, PredictError, Propagator, Satellite};

pub const ISS_TLE: (&str, &str, &str) = (
    "ISS (ZARYA)",
    "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992",
    "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008",
);

pub fn iss() -> Satellite {
    Satellite::from_tle(Some(ISS_TLE.0.to_string()), ISS_TLE.1, ISS_TLE.2).unwrap()
}

pub fn kyutech() -> GroundStation {
    GroundStation::new(33.8958, 130.8750)
}

pub fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 13, 0, 0, 0).unwrap()
}

/// Elevation as a function of whole seconds since `base`.
pub struct Profile<F> {
    pub base: DateTime<Utc>,
    pub elevation: F,
}

impl<F: Fn(i64) -> f64> Profile<F> {
    pub fn new(elevation: F) -> Self {
        Self {
            base: base(),
            elevation,
        }
    }
}

impl<F: Fn(i64) -> f64> Propagator for Profile<F> {
    fn elevation_deg(
        &self,
        _station: &GroundStation,
        _satellite: &Satellite,
        at: DateTime<Utc>,
    ) -> Result<f64, PredictError> {
        Ok((self.elevation)((at - self.base).num_seconds()))
    }
}

/// Triangle profile: rises at `rise`, peaks at `peak` with `max` degrees, sets at `set`.
pub fn triangle(t: i64, rise: i64, peak: i64, set: i64, max: f64) -> f64 {
    if t < rise || t >= set {
        -1.0
    } else if t <= peak {
        max * (t - rise + 1) as f64 / (peak - rise + 1) as f64
    } else {
        max * (set - t) as f64 / (set - peak) as f64
    }
}

/// Repeats `triangle` every `period` seconds.
pub fn periodic(t: i64, period: i64, rise: i64, peak: i64, set: i64, max: f64) -> f64 {
    triangle(t.rem_euclid(period), rise, peak, set, max)
}
