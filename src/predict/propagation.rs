use chrono::{DateTime, Utc};

use crate::predict::{GroundStation, PredictError, Satellite};

/// Source of topocentric elevation for a satellite.
///
/// Implementations must be deterministic for a given
/// (station, satellite, instant) within one run.
pub trait Propagator {
    fn elevation_deg(
        &self,
        station: &GroundStation,
        satellite: &Satellite,
        at: DateTime<Utc>,
    ) -> Result<f64, PredictError>;
}

/// SGP4 propagation from the satellite's TLE.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sgp4Propagator;

impl Propagator for Sgp4Propagator {
    fn elevation_deg(
        &self,
        station: &GroundStation,
        satellite: &Satellite,
        at: DateTime<Utc>,
    ) -> Result<f64, PredictError> {
        let minutes = satellite
            .elements
            .datetime_to_minutes_since_epoch(&at.naive_utc())
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let prediction = satellite
            .constants
            .propagate(minutes)
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let sidereal =
            sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&at.naive_utc()));

        let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
        let sta_ecef = station.position_ecef_km();
        let dr = [
            sat_ecef[0] - sta_ecef[0],
            sat_ecef[1] - sta_ecef[1],
            sat_ecef[2] - sta_ecef[2],
        ];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
        if range_km <= 0.0 {
            return Err(PredictError::Propagation(format!(
                "{} collocated with ground station at {}",
                satellite.name, at
            )));
        }

        let (_, _, up) = ecef_to_enu(dr, station.lat_rad(), station.lon_rad());
        Ok((up / range_km).asin().to_degrees())
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
