use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    /// No event can be submitted until credentials are fixed.
    #[error("calendar authentication failed: {0}")]
    Auth(String),
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("calendar rejected event ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid calendar endpoint: {0}")]
    Endpoint(String),
}

impl CalendarError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, CalendarError::Auth(_))
    }
}
