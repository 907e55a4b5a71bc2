use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sgp4::{Constants, Elements};

use crate::predict::error::PredictError;

/// A tracked object with its orbital elements loaded.
pub struct Satellite {
    pub name: String,
    pub norad_id: u64,
    pub elements: Elements,
    pub constants: Constants,
}

impl Satellite {
    pub fn from_tle(name: Option<String>, line1: &str, line2: &str) -> Result<Self, PredictError> {
        let invalid = |message: String| PredictError::InvalidTle {
            file: name.clone().unwrap_or_else(|| "<unnamed>".to_string()),
            message,
        };

        let elements = Elements::from_tle(name.clone(), line1.as_bytes(), line2.as_bytes())
            .map_err(|e| invalid(e.to_string()))?;
        let constants = Constants::from_elements(&elements).map_err(|e| invalid(e.to_string()))?;

        let name = name.unwrap_or_else(|| format!("NORAD {}", elements.norad_id));
        Ok(Self {
            name,
            norad_id: elements.norad_id,
            elements,
            constants,
        })
    }
}

impl std::fmt::Debug for Satellite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Satellite")
            .field("name", &self.name)
            .field("norad_id", &self.norad_id)
            .finish_non_exhaustive()
    }
}

/// One contiguous visibility window.
///
/// A pass with zero duration is degenerate: the search ran out of budget
/// before seeing a rise or a set, and the pass is not usable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pass {
    pub aos: DateTime<Utc>,
    pub los: DateTime<Utc>,
    pub duration_seconds: i64,
    pub max_elevation_deg: f64,
}

impl Pass {
    pub fn new(aos: DateTime<Utc>, los: DateTime<Utc>, max_elevation_deg: f64) -> Self {
        debug_assert!(aos <= los);
        Self {
            aos,
            los,
            duration_seconds: (los - aos).num_seconds(),
            max_elevation_deg,
        }
    }

    pub fn degenerate(at: DateTime<Utc>) -> Self {
        Self::new(at, at, 0.0)
    }

    pub fn duration(&self) -> Duration {
        self.los - self.aos
    }

    pub fn is_degenerate(&self) -> bool {
        self.duration_seconds == 0
    }
}
