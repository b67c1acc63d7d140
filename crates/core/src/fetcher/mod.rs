//! Image download stage.
//!
//! A [`Fetcher`] writes one URL to one file; [`FetchStage`] fans a job's URL
//! list out over a bounded number of fetchers and collects a [`BatchResult`].

mod error;
mod http;
mod stage;
mod traits;

pub use error::FetchError;
pub use http::{build_http_client, HttpFetcher};
pub use stage::{file_name_from_url, BatchResult, FailedFetch, FetchStage};
pub use traits::Fetcher;
