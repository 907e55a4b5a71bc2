use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::predict::error::PredictError;
use crate::predict::types::Satellite;
use crate::predict::TleFetcher;

/// Satellites parsed from one TLE set, looked up by name or NORAD id.
#[derive(Debug, Default)]
pub struct ElementCatalog {
    satellites: Vec<Satellite>,
}

impl ElementCatalog {
    /// Parse TLE text. Entries that fail to parse are logged and skipped.
    pub fn from_tle_text(content: &str, source: &str) -> Result<Self, PredictError> {
        let mut satellites = Vec::new();

        for (name, line1, line2) in parse_multi_tle(content) {
            match Satellite::from_tle(name.clone(), &line1, &line2) {
                Ok(sat) => satellites.push(sat),
                Err(e) => {
                    log::warn!(
                        "Skipping TLE {} in {}: {}",
                        name.as_deref().unwrap_or("<unnamed>"),
                        source,
                        e
                    );
                }
            }
        }

        if satellites.is_empty() {
            return Err(PredictError::NoSatellites);
        }

        log::info!("Loaded {} satellites from {}", satellites.len(), source);
        Ok(Self { satellites })
    }

    /// Look up by NORAD id when `key` is numeric, otherwise by
    /// case-insensitive object name.
    pub fn get(&self, key: &str) -> Option<&Satellite> {
        let key = key.trim();
        if let Ok(norad_id) = key.parse::<u64>() {
            return self.satellites.iter().find(|s| s.norad_id == norad_id);
        }
        self.satellites
            .iter()
            .find(|s| s.name.trim().eq_ignore_ascii_case(key))
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }
}

/// Locally cached TLE file refreshed from the network once it is older
/// than `max_age`.
#[derive(Debug, Clone)]
pub struct TleCache {
    path: PathBuf,
    url: Option<String>,
    max_age: Duration,
}

impl TleCache {
    pub fn new(path: PathBuf, url: Option<String>, max_age: Duration) -> Self {
        Self { path, url, max_age }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable cache counts as stale.
    pub fn is_stale(&self, now: SystemTime) -> bool {
        let Ok(modified) = fs::metadata(&self.path).and_then(|m| m.modified()) else {
            return true;
        };
        now.duration_since(modified).unwrap_or_default() > self.max_age
    }

    /// Return TLE text, refreshing the cache first when it is stale.
    ///
    /// A failed refresh falls back to the stale copy if one exists.
    pub fn load(&self, fetcher: &dyn TleFetcher) -> Result<String, PredictError> {
        let exists = self.path.is_file();

        if self.is_stale(SystemTime::now()) {
            match &self.url {
                Some(url) => match self.refresh(fetcher, url) {
                    Ok(content) => return Ok(content),
                    Err(e) if exists => {
                        log::warn!(
                            "TLE refresh failed, using stale cache {}: {}",
                            self.path.display(),
                            e
                        );
                    }
                    Err(e) => return Err(e),
                },
                None if exists => {
                    log::warn!(
                        "TLE cache {} is older than {} and no source URL is configured",
                        self.path.display(),
                        humantime::format_duration(self.max_age)
                    );
                }
                None => {
                    return Err(PredictError::CacheNotFound(
                        self.path.display().to_string(),
                    ))
                }
            }
        } else {
            log::debug!("TLE cache {} is fresh", self.path.display());
        }

        Ok(fs::read_to_string(&self.path)?)
    }

    fn refresh(&self, fetcher: &dyn TleFetcher, url: &str) -> Result<String, PredictError> {
        let content = fetcher.fetch(url)?;
        if parse_multi_tle(&content).is_empty() {
            return Err(PredictError::Fetch {
                url: url.to_string(),
                message: "response contains no TLE sets".to_string(),
            });
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, &content)?;
        log::info!("TLE cache {} refreshed", self.path.display());
        Ok(content)
    }
}

/// Parse multi-satellite TLE content
fn parse_multi_tle(content: &str) -> Vec<(Option<String>, String, String)> {
    let lines: Vec<&str> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut result = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("1 ") && i + 1 < lines.len() && lines[i + 1].starts_with("2 ") {
            // 2-line TLE (no name)
            result.push((None, lines[i].to_string(), lines[i + 1].to_string()));
            i += 2;
        } else if i + 2 < lines.len()
            && lines[i + 1].starts_with("1 ")
            && lines[i + 2].starts_with("2 ")
        {
            // 3-line TLE, Space-Track prefixes the name with "0 "
            let name = lines[i].strip_prefix("0 ").unwrap_or(lines[i]).trim();
            result.push((
                Some(name.to_string()),
                lines[i + 1].to_string(),
                lines[i + 2].to_string(),
            ));
            i += 3;
        } else {
            i += 1; // Skip unknown line
        }
    }

    result
}
