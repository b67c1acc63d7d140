//! Mock fetcher for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, Fetcher};

/// Tracks concurrent calls and the high-water mark.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    current: AtomicUsize,
    max: AtomicUsize,
}

impl InFlight {
    pub(crate) fn enter(self: &Arc<Self>) -> InFlightGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(Arc::clone(self))
    }

    pub(crate) fn max(&self) -> usize {
        self.max.load(Ordering::SeqCst)
    }
}

pub(crate) struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the Fetcher trait.
///
/// Writes a fixed payload for every URL unless the URL was marked failing,
/// in which case a truncated file is written before the error is returned.
///
/// # Example
///
/// ```rust,ignore
/// use imgup_core::testing::MockFetcher;
///
/// let fetcher = MockFetcher::new();
/// fetcher.fail_url("https://img.example/2.jpg").await;
///
/// let stage = FetchStage::new(Arc::new(fetcher), 5);
/// ```
#[derive(Debug)]
pub struct MockFetcher {
    /// URLs that fail.
    failing: Arc<RwLock<HashSet<String>>>,
    /// Every URL handed to `fetch`.
    fetched: Arc<RwLock<Vec<String>>>,
    payload: Vec<u8>,
    delay: Option<Duration>,
    in_flight: Arc<InFlight>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            failing: Arc::new(RwLock::new(HashSet::new())),
            fetched: Arc::new(RwLock::new(Vec::new())),
            payload: b"\x89PNG\r\n\x1a\nmock".to_vec(),
            delay: None,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Bytes written for successful fetches.
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Make fetches of `url` fail.
    pub async fn fail_url(&self, url: impl Into<String>) {
        self.failing.write().await.insert(url.into());
    }

    pub async fn fetched_urls(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetched.read().await.len()
    }

    /// Highest number of fetches observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.in_flight.max()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let _guard = self.in_flight.enter();
        self.fetched.write().await.push(url.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.read().await.contains(url) {
            // Leave a partial file behind like an interrupted transfer
            tokio::fs::write(dest, &self.payload[..self.payload.len() / 2]).await?;
            return Err(FetchError::network(url, "connection reset by peer"));
        }

        tokio::fs::write(dest, &self.payload).await?;
        Ok(self.payload.len() as u64)
    }
}
