//! Trait definitions for the fetcher module.

use async_trait::async_trait;
use std::path::Path;

use super::error::FetchError;

/// Downloads a single remote resource to a local file.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Downloads `url` into `dest`, returning the number of bytes written.
    ///
    /// On error `dest` may be left partially written; callers clean it up.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}
