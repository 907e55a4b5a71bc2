use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::predict::error::PredictError;
use crate::predict::types::{Pass, Satellite};
use crate::predict::{GroundStation, Propagator};

const AOS_SEARCH_SECONDS: i64 = 24 * 60 * 60;
const LOS_SEARCH_SECONDS: i64 = 30 * 60;
const HORIZON_ELEVATION: f64 = 0.0;

/// How the peak elevation of a pass is measured.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PeakSearch {
    /// Walk forward from AOS and stop at the first sample that does not
    /// exceed the running maximum.
    ///
    /// Assumes a single-peak profile. A plateau or a dip before the true
    /// peak ends the walk early and under-reports the maximum. Kept as the
    /// default so published schedules stay reproducible.
    #[default]
    Greedy,
    /// Every second between AOS and LOS is sampled.
    FullWindow,
}

/// A pass plus the instant the next search should start from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassSearch {
    pub pass: Pass,
    /// LOS for a usable pass. For a degenerate pass this is past the
    /// exhausted search window, so repeated searches always make progress.
    pub resume_at: DateTime<Utc>,
}

/// Find the next pass at or after `start`, scanning at one second resolution.
pub fn find_pass<P: Propagator + ?Sized>(
    propagator: &P,
    station: &GroundStation,
    satellite: &Satellite,
    start: DateTime<Utc>,
    peak: PeakSearch,
) -> Result<Pass, PredictError> {
    search_pass(propagator, station, satellite, start, peak).map(|s| s.pass)
}

pub fn search_pass<P: Propagator + ?Sized>(
    propagator: &P,
    station: &GroundStation,
    satellite: &Satellite,
    start: DateTime<Utc>,
    peak: PeakSearch,
) -> Result<PassSearch, PredictError> {
    let elevation = |t: DateTime<Utc>| propagator.elevation_deg(station, satellite, t);

    let Some(aos) = find_aos(&elevation, start)? else {
        log::debug!(
            "{}: no rise within {}s of {}",
            satellite.name,
            AOS_SEARCH_SECONDS,
            start
        );
        return Ok(PassSearch {
            pass: Pass::degenerate(start),
            resume_at: start + Duration::seconds(AOS_SEARCH_SECONDS),
        });
    };

    let Some(los) = find_los(&elevation, aos)? else {
        log::debug!(
            "{}: still above horizon {}s after rise at {}",
            satellite.name,
            LOS_SEARCH_SECONDS,
            aos
        );
        return Ok(PassSearch {
            pass: Pass::degenerate(aos),
            resume_at: aos + Duration::seconds(LOS_SEARCH_SECONDS),
        });
    };

    let duration = (los - aos).num_seconds();
    let max_elevation = match peak {
        PeakSearch::Greedy => greedy_peak(&elevation, aos, duration)?,
        PeakSearch::FullWindow => full_window_peak(&elevation, aos, duration)?,
    };

    Ok(PassSearch {
        pass: Pass::new(aos, los, max_elevation),
        resume_at: los,
    })
}

fn find_aos<F>(elevation: &F, start: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, PredictError>
where
    F: Fn(DateTime<Utc>) -> Result<f64, PredictError>,
{
    for i in 0..AOS_SEARCH_SECONDS {
        let t = start + Duration::seconds(i);
        if elevation(t)? > HORIZON_ELEVATION {
            return Ok(Some(t));
        }
    }
    Ok(None)
}

fn find_los<F>(elevation: &F, aos: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, PredictError>
where
    F: Fn(DateTime<Utc>) -> Result<f64, PredictError>,
{
    // The whole window is scanned: a later set overwrites an earlier one.
    let mut visible = false;
    let mut los = None;
    for i in 0..LOS_SEARCH_SECONDS {
        let t = aos + Duration::seconds(i);
        if elevation(t)? > HORIZON_ELEVATION {
            visible = true;
        } else if visible {
            los = Some(t);
            visible = false;
        }
    }
    Ok(los)
}

fn greedy_peak<F>(elevation: &F, aos: DateTime<Utc>, duration: i64) -> Result<f64, PredictError>
where
    F: Fn(DateTime<Utc>) -> Result<f64, PredictError>,
{
    let mut max = 0.0;
    for i in 0..duration {
        let el = elevation(aos + Duration::seconds(i))?;
        if el > max {
            max = el;
        } else {
            break;
        }
    }
    Ok(max)
}

fn full_window_peak<F>(elevation: &F, aos: DateTime<Utc>, duration: i64) -> Result<f64, PredictError>
where
    F: Fn(DateTime<Utc>) -> Result<f64, PredictError>,
{
    let mut max: f64 = 0.0;
    for i in 0..duration {
        max = max.max(elevation(aos + Duration::seconds(i))?);
    }
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predict::testing::{base, iss, kyutech, triangle, Profile};
    use crate::predict::Sgp4Propagator;

    fn search<F: Fn(i64) -> f64>(profile: F, start_offset: i64, peak: PeakSearch) -> PassSearch {
        let propagator = Profile::new(profile);
        search_pass(
            &propagator,
            &kyutech(),
            &iss(),
            base() + Duration::seconds(start_offset),
            peak,
        )
        .unwrap()
    }

    #[test]
    fn finds_rise_set_and_peak_of_triangle_profile() {
        let pass = search(|t| triangle(t, 120, 420, 720, 45.0), 0, PeakSearch::Greedy).pass;

        assert_eq!(pass.aos, base() + Duration::seconds(120));
        assert_eq!(pass.los, base() + Duration::seconds(720));
        assert_eq!(pass.duration_seconds, 600);
        assert_eq!(pass.duration(), Duration::seconds(600));
        assert!((pass.max_elevation_deg - 45.0).abs() < 1e-9);
    }

    #[test]
    fn find_pass_matches_search_pass() {
        let propagator = Profile::new(|t| triangle(t, 120, 420, 720, 45.0));
        let pass = find_pass(&propagator, &kyutech(), &iss(), base(), PeakSearch::Greedy).unwrap();
        assert_eq!(pass.aos, base() + Duration::seconds(120));
        assert_eq!(pass.los, base() + Duration::seconds(720));
    }

    #[test]
    fn resumes_at_los_after_usable_pass() {
        let found = search(|t| triangle(t, 120, 420, 720, 45.0), 0, PeakSearch::Greedy);
        assert_eq!(found.resume_at, found.pass.los);
    }

    #[test]
    fn start_inside_a_pass_reports_start_as_aos() {
        let pass = search(|t| triangle(t, 120, 420, 720, 45.0), 500, PeakSearch::Greedy).pass;
        assert_eq!(pass.aos, base() + Duration::seconds(500));
        assert_eq!(pass.los, base() + Duration::seconds(720));
        // Already descending: first sample is the running maximum.
        assert!((pass.max_elevation_deg - triangle(500, 120, 420, 720, 45.0)).abs() < 1e-9);
    }

    #[test]
    fn never_rising_yields_degenerate_pass_at_start() {
        let found = search(|_| -5.0, 0, PeakSearch::Greedy);
        assert_eq!(found.pass, Pass::degenerate(base()));
        assert!(found.pass.is_degenerate());
        assert_eq!(found.pass.max_elevation_deg, 0.0);
        assert_eq!(found.resume_at, base() + Duration::hours(24));
    }

    #[test]
    fn horizon_touching_zero_is_not_a_rise() {
        let found = search(|_| 0.0, 0, PeakSearch::Greedy);
        assert!(found.pass.is_degenerate());
    }

    #[test]
    fn rise_after_search_window_is_not_found() {
        let day = AOS_SEARCH_SECONDS;
        let found = search(
            move |t| triangle(t, day, day + 300, day + 600, 30.0),
            0,
            PeakSearch::Greedy,
        );
        assert!(found.pass.is_degenerate());
        assert_eq!(found.pass.aos, base());
    }

    #[test]
    fn never_setting_yields_zero_duration_at_aos() {
        let found = search(|t: i64| if t >= 60 { 20.0 } else { -1.0 }, 0, PeakSearch::Greedy);
        let aos = base() + Duration::seconds(60);
        assert_eq!(found.pass.aos, aos);
        assert_eq!(found.pass.los, aos);
        assert_eq!(found.pass.duration_seconds, 0);
        assert_eq!(found.pass.max_elevation_deg, 0.0);
        assert_eq!(found.resume_at, aos + Duration::minutes(30));
    }

    #[test]
    fn later_set_within_window_overwrites_los() {
        // Two short passes inside one set-search window.
        let profile = |t: i64| {
            if (100..200).contains(&t) || (400..500).contains(&t) {
                10.0
            } else {
                -1.0
            }
        };
        let found = search(profile, 0, PeakSearch::Greedy);
        assert_eq!(found.pass.aos, base() + Duration::seconds(100));
        assert_eq!(found.pass.los, base() + Duration::seconds(500));
        assert_eq!(found.pass.duration_seconds, 400);
        assert_eq!(found.resume_at, found.pass.los);
    }

    // Greedy scan stops at the plateau and misses the real peak.
    #[test]
    fn greedy_peak_under_reports_plateau_profile() {
        let profile = |t: i64| match t {
            t if t < 100 => -1.0,
            100..=109 => 10.0,
            110..=199 => 10.0 + (t - 109) as f64 * 0.5,
            200..=299 => 55.0 - (t - 199) as f64 * 0.5,
            _ => -1.0,
        };
        let greedy = search(profile, 0, PeakSearch::Greedy).pass;
        let full = search(profile, 0, PeakSearch::FullWindow).pass;

        assert_eq!(greedy.aos, full.aos);
        assert_eq!(greedy.los, full.los);
        assert!((greedy.max_elevation_deg - 10.0).abs() < 1e-9);
        assert!((full.max_elevation_deg - 55.0).abs() < 1e-9);
    }

    #[test]
    fn modes_agree_on_single_peak_profile() {
        let profile = |t: i64| triangle(t, 10, 250, 700, 72.5);
        let greedy = search(profile, 0, PeakSearch::Greedy).pass;
        let full = search(profile, 0, PeakSearch::FullWindow).pass;
        assert_eq!(greedy, full);
    }

    #[test]
    fn aos_never_after_los() {
        let profiles: [fn(i64) -> f64; 4] = [
            |t| triangle(t, 120, 420, 720, 45.0),
            |_| -3.0,
            |t| if t > 5 { 1.0 } else { -1.0 },
            |t| triangle(t, 0, 0, 1, 0.5),
        ];
        for profile in profiles {
            let pass = search(profile, 0, PeakSearch::Greedy).pass;
            assert!(pass.aos <= pass.los);
            assert_eq!(pass.duration(), pass.los - pass.aos);
        }
    }

    #[test]
    fn real_iss_pass_is_short_and_positive() {
        let sat = iss();
        let start = sat.elements.datetime.and_utc();
        let pass = find_pass(&Sgp4Propagator, &kyutech(), &sat, start, PeakSearch::Greedy).unwrap();

        // A low orbit is seen at least once a day from mid latitudes.
        assert!(!pass.is_degenerate());
        assert!(pass.aos >= start);
        assert!(pass.duration_seconds > 0 && pass.duration_seconds < 30 * 60);
        assert!(pass.max_elevation_deg > 0.0 && pass.max_elevation_deg <= 90.0);
    }
}
