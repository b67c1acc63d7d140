use async_trait::async_trait;
use serde::Serialize;

use super::error::ScrapeError;

/// Images and title extracted from a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapedPage {
    /// Absolute image URLs in document order.
    pub images: Vec<String>,
    pub title: Option<String>,
}

/// Turns a page URL into a list of image URLs.
#[async_trait]
pub trait PageScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError>;
}
