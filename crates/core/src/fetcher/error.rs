//! Error types for the fetcher module.

use thiserror::Error;

/// Errors that can occur while downloading a single image.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed or has no usable file name.
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    /// The request timed out.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Connection or protocol failure.
    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    /// The HTTP client could not be built from configuration.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    /// Writing the downloaded file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a network error.
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Maps a reqwest error for `url` onto the fetch taxonomy.
    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::network(url, err.to_string())
        }
    }
}
