use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarError, CalendarSink, EventDescriptor};

const CALENDARS_ENDPOINT: &str = "https://www.googleapis.com/calendar/v3/calendars";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authorized-user token file as written by the Google OAuth client libraries.
///
/// Unknown fields (scopes, universe domain, ...) are kept so a refreshed
/// token can be written back without losing them.
#[derive(Debug, Deserialize, Serialize)]
struct TokenFile {
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenFile {
    fn access_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        match self.expiry {
            Some(expiry) if expiry <= now => None,
            _ => Some(token),
        }
    }
}

/// Credentials for the OAuth `refresh_token` grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub token_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct AccessGrant {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: Option<i64>,
}

/// Exchanges a refresh token for a new access token.
pub trait TokenRefresher {
    fn refresh(&self, request: &RefreshRequest) -> Result<AccessGrant, CalendarError>;
}

/// Refreshes against the Google OAuth token endpoint.
pub struct OAuthRefresher {
    client: reqwest::blocking::Client,
}

impl OAuthRefresher {
    pub fn new() -> Result<Self, CalendarError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl TokenRefresher for OAuthRefresher {
    fn refresh(&self, request: &RefreshRequest) -> Result<AccessGrant, CalendarError> {
        let response = self
            .client
            .post(&request.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", request.client_id.as_str()),
                ("client_secret", request.client_secret.as_str()),
                ("refresh_token", request.refresh_token.as_str()),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            // invalid_grant and friends: the user has to re-authorize
            return Err(CalendarError::Auth(format!(
                "token refresh returned {}: {}",
                status,
                response.text().unwrap_or_default()
            )));
        }
        Ok(response.json()?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedEvent {
    html_link: Option<String>,
    id: Option<String>,
}

/// Inserts events through the Google Calendar v3 REST API.
pub struct GoogleCalendar {
    client: reqwest::blocking::Client,
    token: String,
    endpoint: String,
}

impl GoogleCalendar {
    pub fn new(token: String) -> Result<Self, CalendarError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            token,
            endpoint: CALENDARS_ENDPOINT.to_string(),
        })
    }

    /// Load the access token from `path`. An expired token is refreshed
    /// through the OAuth token endpoint and written back to `path`.
    pub fn from_token_file(path: &Path, now: DateTime<Utc>) -> Result<Self, CalendarError> {
        let refresher = OAuthRefresher::new()?;
        Self::new(read_token(path, now, &refresher)?)
    }

    fn events_url(&self, calendar_id: &str) -> Result<reqwest::Url, CalendarError> {
        let mut url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| CalendarError::Endpoint(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| CalendarError::Endpoint(self.endpoint.clone()))?
            .push(calendar_id)
            .push("events");
        url.query_pairs_mut().append_pair("sendNotifications", "true");
        Ok(url)
    }
}

impl CalendarSink for GoogleCalendar {
    fn submit(
        &mut self,
        calendar_id: &str,
        event: &EventDescriptor,
    ) -> Result<String, CalendarError> {
        let response = self
            .client
            .post(self.events_url(calendar_id)?)
            .bearer_auth(&self.token)
            .json(event)
            .send()?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CalendarError::Auth(format!("server returned {}", status)));
        }
        if !status.is_success() {
            return Err(CalendarError::Rejected {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let created: CreatedEvent = response.json()?;
        Ok(created.html_link.or(created.id).unwrap_or_default())
    }
}

fn read_token(
    path: &Path,
    now: DateTime<Utc>,
    refresher: &dyn TokenRefresher,
) -> Result<String, CalendarError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CalendarError::Auth(format!("cannot read token file {}: {}", path.display(), e))
    })?;
    let mut file: TokenFile = serde_json::from_str(&content).map_err(|e| {
        CalendarError::Auth(format!("malformed token file {}: {}", path.display(), e))
    })?;

    if let Some(token) = file.access_token(now) {
        return Ok(token.to_string());
    }

    let Some(request) = refresh_request(&file) else {
        return Err(CalendarError::Auth(match file.expiry {
            Some(expiry) if file.token.is_some() => format!(
                "access token in {} expired at {} and cannot be refreshed, re-authorize",
                path.display(),
                expiry
            ),
            _ => format!("no usable access token in {}", path.display()),
        }));
    };

    log::info!("Refreshing calendar access token from {}", request.token_uri);
    let grant = refresher.refresh(&request)?;
    file.expiry = grant
        .expires_in
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime));
    file.token = Some(grant.access_token.clone());

    match serde_json::to_string_pretty(&file) {
        Ok(json) => {
            if let Err(e) = std::fs::write(path, json) {
                log::warn!("Cannot write refreshed token to {}: {}", path.display(), e);
            }
        }
        Err(e) => log::warn!("Cannot serialise refreshed token: {}", e),
    }

    Ok(grant.access_token)
}

fn refresh_request(file: &TokenFile) -> Option<RefreshRequest> {
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    Some(RefreshRequest {
        token_uri: non_empty(&file.token_uri).unwrap_or_else(|| TOKEN_ENDPOINT.to_string()),
        client_id: non_empty(&file.client_id)?,
        client_secret: non_empty(&file.client_secret)?,
        refresh_token: non_empty(&file.refresh_token)?,
    })
}
