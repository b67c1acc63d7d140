//! Error types for the scraper module.

use thiserror::Error;

/// Errors that can occur while scraping a page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The page URL is not an absolute http(s) URL.
    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),

    /// The page could not be retrieved.
    #[error("Failed to fetch page {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The page answered with a non-success status.
    #[error("Page {url} returned status {status}")]
    Status { url: String, status: u16 },
}
