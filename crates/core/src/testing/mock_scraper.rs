//! Mock page scraper for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::scraper::{PageScraper, ScrapeError, ScrapedPage};

/// Mock implementation of the PageScraper trait.
///
/// Serves pre-registered pages; any other URL answers like a 404.
#[derive(Debug, Default)]
pub struct MockPageScraper {
    pages: Arc<RwLock<HashMap<String, ScrapedPage>>>,
}

impl MockPageScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_page(&self, url: impl Into<String>, page: ScrapedPage) {
        self.pages.write().await.insert(url.into(), page);
    }
}

#[async_trait]
impl PageScraper for MockPageScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        self.pages
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
