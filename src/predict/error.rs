use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("TLE cache file not found: {0}")]
    CacheNotFound(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Invalid TLE format in {file}: {message}")]
    InvalidTle { file: String, message: String },
    #[error("TLE fetch from {url} failed: {message}")]
    Fetch { url: String, message: String },
    #[error("Propagation error: {0}")]
    Propagation(String),
    #[error("No satellites loaded")]
    NoSatellites,
}
