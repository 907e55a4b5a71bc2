use std::time::Duration;

use crate::predict::PredictError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Network source of TLE text.
pub trait TleFetcher {
    fn fetch(&self, url: &str) -> Result<String, PredictError>;
}

/// Plain HTTP GET, e.g. a CelesTrak `FORMAT=tle` query.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, PredictError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| PredictError::Fetch {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl TleFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, PredictError> {
        let fetch_error = |message: String| PredictError::Fetch {
            url: url.to_string(),
            message,
        };

        log::info!("Fetching TLEs from {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("server returned {}", response.status())));
        }

        response.text().map_err(|e| fetch_error(e.to_string()))
    }
}
