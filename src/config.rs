use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use thiserror::Error;

use crate::calendar::{default_reminders, Reminder};
use crate::predict::{GroundStation, PeakSearch, TleCache};
use crate::report::LocalZone;
use crate::scheduler::{Operation, Operator, OperatorRotation};

const DEFAULT_TLE_MAX_AGE: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{path}: {source}")]
    OperatorsFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub station: StationConfig,
    #[serde(default)]
    pub timezone: Option<TimezoneConfig>,
    pub tle: TleConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub operations: Vec<OperationConfig>,
    /// Directory relative paths are resolved against; the config file's own.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimezoneConfig {
    pub name: String,
    pub utc_offset: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TleConfig {
    pub cache_file: PathBuf,
    pub url: Option<String>,
    #[serde(default, with = "humantime_serde_opt")]
    pub max_age: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    #[serde(default = "default_reminders")]
    pub reminders: Vec<Reminder>,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            reminders: default_reminders(),
        }
    }
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub week_offset: i64,
    #[serde(default)]
    pub peak_search: PeakSearch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationConfig {
    pub name: String,
    pub satellite: String,
    pub label: Option<String>,
    #[serde(default)]
    pub operation_type: String,
    #[serde(default)]
    pub description: String,
    pub min_elevation_deg: f64,
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub operators: Vec<String>,
    pub operators_file: Option<PathBuf>,
}

mod humantime_serde_opt {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom))
            .transpose()
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        config.base_dir = Path::new(path)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.station()?;
        self.zone()?;

        let mut names = HashSet::new();
        for op in &self.operations {
            if !names.insert(op.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate operation name: {}",
                    op.name
                )));
            }
            if !op.operators.is_empty() && op.operators_file.is_some() {
                return Err(ConfigError::Invalid(format!(
                    "operation {}: set either operators or operators_file, not both",
                    op.name
                )));
            }
        }
        Ok(())
    }

    pub fn station(&self) -> Result<GroundStation, ConfigError> {
        GroundStation::from_coordinates(&self.station.coordinates, Some(self.station.altitude_m))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "station coordinates must be \"lat, lon\" in degrees, got {:?}",
                    self.station.coordinates
                ))
            })
    }

    /// Reporting zone; UTC when none is configured.
    pub fn zone(&self) -> Result<LocalZone, ConfigError> {
        match &self.timezone {
            None => Ok(LocalZone::utc()),
            Some(tz) => Ok(LocalZone {
                name: tz.name.clone(),
                offset: tz.utc_offset.trim().parse::<FixedOffset>().map_err(|e| {
                    ConfigError::Invalid(format!(
                        "utc_offset must look like +09:00, got {:?}: {}",
                        tz.utc_offset, e
                    ))
                })?,
            }),
        }
    }

    pub fn tle_cache(&self) -> TleCache {
        TleCache::new(
            self.resolve(&self.tle.cache_file),
            self.tle.url.clone(),
            self.tle.max_age.unwrap_or(DEFAULT_TLE_MAX_AGE),
        )
    }

    pub fn token_file(&self) -> PathBuf {
        self.resolve(&self.calendar.token_file)
    }

    /// Build operations, reading operator lists from files where configured.
    pub fn operations(&self) -> Result<Vec<Operation>, ConfigError> {
        self.operations.iter().map(|op| self.operation(op)).collect()
    }

    fn operation(&self, op: &OperationConfig) -> Result<Operation, ConfigError> {
        let operators = match &op.operators_file {
            Some(file) => {
                let path = self.resolve(file);
                let content = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::OperatorsFile { path, source })?;
                parse_operators(&content)
            }
            None => op.operators.iter().map(|o| Operator::new(o.trim())).collect(),
        };

        Ok(Operation {
            name: op.name.clone(),
            satellite: op.satellite.clone(),
            label: op.label.clone().unwrap_or_else(|| op.satellite.clone()),
            operation_type: op.operation_type.clone(),
            description: op.description.clone(),
            min_elevation_deg: op.min_elevation_deg,
            calendar_id: op.calendar_id.clone(),
            operators,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// One address per line; blank lines and `#` comments are ignored.
fn parse_operators(content: &str) -> OperatorRotation {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(Operator::new)
        .collect()
}
