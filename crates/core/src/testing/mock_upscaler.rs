//! Mock upscaler for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};

use crate::upscaler::{UpscaleError, Upscaler};

use super::mock_fetcher::InFlight;

/// Mock implementation of the Upscaler trait.
///
/// Copies the input to the output. Provides controllable behavior for testing:
/// - Fail on the Nth invocation or for named input files
/// - Delay every invocation
/// - Hold invocations behind a gate until the test releases them
#[derive(Debug)]
pub struct MockUpscaler {
    /// Inputs handed to `upscale`, in call order.
    calls: Arc<RwLock<Vec<PathBuf>>>,
    /// 1-based invocation number that fails.
    fail_on_call: Arc<RwLock<Option<usize>>>,
    /// Input file names that fail.
    failing_files: Arc<RwLock<HashSet<String>>>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    in_flight: Arc<InFlight>,
}

impl Default for MockUpscaler {
    fn default() -> Self {
        Self::new()
    }
}

impl MockUpscaler {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            fail_on_call: Arc::new(RwLock::new(None)),
            failing_files: Arc::new(RwLock::new(HashSet::new())),
            delay: None,
            gate: None,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Block every invocation until [`release`](Self::release) lets it through.
    pub fn with_gate(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Let `n` gated invocations proceed.
    pub fn release(&self, n: usize) {
        if let Some(ref gate) = self.gate {
            gate.add_permits(n);
        }
    }

    pub async fn fail_on_call(&self, n: usize) {
        *self.fail_on_call.write().await = Some(n);
    }

    pub async fn fail_file(&self, name: impl Into<String>) {
        self.failing_files.write().await.insert(name.into());
    }

    pub async fn calls(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.in_flight.max()
    }
}

#[async_trait]
impl Upscaler for MockUpscaler {
    fn name(&self) -> &str {
        "mock"
    }

    async fn upscale(&self, input: &Path, output: &Path) -> Result<(), UpscaleError> {
        let _guard = self.in_flight.enter();
        let call_number = {
            let mut calls = self.calls.write().await;
            calls.push(input.to_path_buf());
            calls.len()
        };

        if let Some(ref gate) = self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let file = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let fails = *self.fail_on_call.read().await == Some(call_number)
            || self.failing_files.read().await.contains(&file);
        if fails {
            return Err(UpscaleError::process_failed(
                file,
                Some(255),
                Some("vkCreateDevice failed".to_string()),
            ));
        }

        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}
