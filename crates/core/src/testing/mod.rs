//! Testing utilities and mock implementations.
//!
//! Mocks for every external boundary of the pipeline (network downloads, the
//! upscaler subprocess, page scraping) so orchestrator and API tests run
//! without network access or a GPU.
//!
//! # Example
//!
//! ```rust,ignore
//! use imgup_core::testing::{MockFetcher, MockUpscaler};
//!
//! let fetcher = Arc::new(MockFetcher::new());
//! let upscaler = Arc::new(MockUpscaler::new().with_gate());
//!
//! fetcher.fail_url("http://x/b.jpg").await;
//! upscaler.release(1);
//! ```

mod mock_fetcher;
mod mock_scraper;
mod mock_upscaler;

pub use mock_fetcher::MockFetcher;
pub use mock_scraper::MockPageScraper;
pub use mock_upscaler::MockUpscaler;
