//! Bounded, best-effort batch downloads.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::metrics;

use super::error::FetchError;
use super::traits::Fetcher;

/// A URL that could not be downloaded.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedFetch {
    pub url: String,
    pub error: String,
}

/// Outcome of downloading a batch of URLs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// File names written into the destination directory.
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedFetch>,
}

impl BatchResult {
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Derives the on-disk file name for `url` from its trailing path segment.
///
/// Returns `None` for unparseable URLs and for segments that are empty,
/// dot-names, or contain path separators after percent-decoding.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.next_back()?;
    let decoded = urlencoding::decode(segment).ok()?;

    if decoded.is_empty()
        || decoded == "."
        || decoded == ".."
        || decoded.contains('/')
        || decoded.contains('\\')
        || decoded.contains('\0')
    {
        return None;
    }
    Some(decoded.into_owned())
}

/// Splits `name` into stem and extension (with its dot), matching `Path::file_stem`.
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// Makes the stem of `name` unique within `taken_stems` by suffixing `_N`.
///
/// Output names derive from the stem alone, so `a.jpg` and `a.png` must not
/// share one.
fn unique_name(name: String, taken_stems: &mut HashSet<String>) -> String {
    let (stem, ext) = split_name(&name);
    if taken_stems.insert(stem.to_string()) {
        return name;
    }

    let mut n = 1;
    loop {
        let candidate = format!("{}_{}", stem, n);
        if taken_stems.insert(candidate.clone()) {
            return format!("{}{}", candidate, ext);
        }
        n += 1;
    }
}

/// Downloads every URL of a job into one directory.
///
/// Runs at most `concurrency` downloads at a time. A failed URL is logged and
/// recorded; it never aborts the batch.
pub struct FetchStage {
    fetcher: Arc<dyn Fetcher>,
    concurrency: usize,
}

impl FetchStage {
    pub fn new(fetcher: Arc<dyn Fetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn fetch_all(&self, urls: &[String], dest_dir: &Path) -> BatchResult {
        let mut taken = HashSet::new();
        let planned: Vec<(String, Result<String, FetchError>)> = urls
            .iter()
            .map(|url| {
                let name = file_name_from_url(url)
                    .map(|name| unique_name(name, &mut taken))
                    .ok_or_else(|| FetchError::invalid_url(url, "no usable file name"));
                (url.clone(), name)
            })
            .collect();

        let outcomes: Vec<(String, Result<String, FetchError>)> = stream::iter(planned)
            .map(|(url, name)| async move {
                let outcome = match name {
                    Ok(name) => self.fetch_one(&url, &name, dest_dir).await.map(|_| name),
                    Err(e) => Err(e),
                };
                (url, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut result = BatchResult::default();
        for (url, outcome) in outcomes {
            match outcome {
                Ok(name) => {
                    metrics::DOWNLOADS_TOTAL.with_label_values(&["success"]).inc();
                    result.succeeded.push(name);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Download failed, skipping image");
                    metrics::DOWNLOADS_TOTAL.with_label_values(&["failed"]).inc();
                    result.failed.push(FailedFetch {
                        url,
                        error: e.to_string(),
                    });
                }
            }
        }
        result.succeeded.sort();
        result
    }

    async fn fetch_one(&self, url: &str, name: &str, dest_dir: &Path) -> Result<u64, FetchError> {
        let dest = dest_dir.join(name);
        match self.fetcher.fetch(url, &dest).await {
            Ok(bytes) => {
                metrics::DOWNLOAD_BYTES.inc_by(bytes);
                debug!(url = %url, file = %name, bytes, fetcher = self.fetcher.name(), "Fetched image");
                Ok(bytes)
            }
            Err(e) => {
                // Partial files must not reach the upscaler.
                if let Err(rm_err) = tokio::fs::remove_file(&dest).await {
                    if rm_err.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %dest.display(), error = %rm_err, "Failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }
}
