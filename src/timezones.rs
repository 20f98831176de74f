use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// One selectable time zone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TimeZoneEntry {
    /// Label shown in the selector
    pub name: String,
    /// Whole hours ahead of UTC
    #[serde(rename = "timezone")]
    pub offset_hours: i32,
}

impl TimeZoneEntry {
    pub fn new(name: &str, offset_hours: i32) -> Self {
        TimeZoneEntry {
            name: name.to_string(),
            offset_hours,
        }
    }

    /// The value a selection control carries for this entry.
    pub fn selector_value(&self) -> String {
        self.offset_hours.to_string()
    }
}

/// Where the list of time zones comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeZoneSource {
    Url(String),
    File(PathBuf),
}

impl TimeZoneSource {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            TimeZoneSource::Url(location.to_string())
        } else {
            TimeZoneSource::File(PathBuf::from(location))
        }
    }
}

impl fmt::Display for TimeZoneSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneSource::Url(url) => write!(f, "{url}"),
            TimeZoneSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum TimeZoneLoadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("Couldn't read file: {0}")]
    ReadFileError(#[from] tokio::io::Error),
    #[error("Couldn't parse time zone list: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Loads the time-zone list. Failures are logged and yield an empty list;
/// callers treat an empty list as "no time zones available".
pub async fn load_time_zones(source: &TimeZoneSource) -> Vec<TimeZoneEntry> {
    match try_load_time_zones(source).await {
        Ok(entries) => {
            debug!("loaded {} time zones from {source}", entries.len());
            entries
        }
        Err(err) => {
            error!("failed to load time zones from {source}: {err}");
            Vec::new()
        }
    }
}

async fn try_load_time_zones(
    source: &TimeZoneSource,
) -> Result<Vec<TimeZoneEntry>, TimeZoneLoadError> {
    let body = match source {
        TimeZoneSource::Url(url) => fetch(url).await?,
        TimeZoneSource::File(path) => tokio::fs::read(path).await?,
    };
    Ok(serde_json::from_slice(&body)?)
}

async fn fetch(url: &str) -> Result<Vec<u8>, TimeZoneLoadError> {
    let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(TimeZoneLoadError::Status(response.status()));
    }
    Ok(response.bytes().await?.to_vec())
}
