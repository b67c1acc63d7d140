//! Bounded, fail-fast batch upscaling.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::UpscalerConfig;
use crate::metrics;
use crate::staging::StagingStore;

use super::error::UpscaleError;
use super::traits::Upscaler;

/// Outcome of a fully successful upscale batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpscaleSummary {
    /// Output file names, sorted.
    pub outputs: Vec<String>,
}

impl UpscaleSummary {
    pub fn processed(&self) -> usize {
        self.outputs.len()
    }
}

/// Runs the upscaler over every file in a job's input directory.
///
/// At most `concurrency` invocations run at once. The first failure aborts
/// the batch: unstarted files are skipped and in-flight invocations are
/// dropped, which stops their subprocesses. Each input file is deleted right
/// after its own invocation succeeds.
pub struct UpscaleStage {
    upscaler: Arc<dyn Upscaler>,
    concurrency: usize,
    scale: u8,
    denoise: i8,
}

impl UpscaleStage {
    pub fn new(upscaler: Arc<dyn Upscaler>, config: &UpscalerConfig) -> Self {
        Self::with_params(upscaler, config.concurrency, config.scale, config.denoise)
    }

    pub fn with_params(
        upscaler: Arc<dyn Upscaler>,
        concurrency: usize,
        scale: u8,
        denoise: i8,
    ) -> Self {
        Self {
            upscaler,
            concurrency: concurrency.max(1),
            scale,
            denoise,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Output file name for `input_name`: `{stem}_x{scale}_denoise{level}x.png`.
    pub fn output_name(&self, input_name: &str) -> String {
        self.output_name_for_stem(&Self::stem(input_name))
    }

    fn stem(input_name: &str) -> String {
        Path::new(input_name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| input_name.to_string())
    }

    fn output_name_for_stem(&self, stem: &str) -> String {
        format!("{}_x{}_denoise{}x.png", stem, self.scale, self.denoise)
    }

    /// Pairs every input with a distinct output name. Inputs sharing a stem
    /// get `_N` appended to the stem, in listing order.
    fn plan_outputs(&self, files: Vec<String>) -> Vec<(String, String)> {
        let mut taken = HashSet::new();
        files
            .into_iter()
            .map(|file| {
                let stem = Self::stem(&file);
                let mut name = self.output_name_for_stem(&stem);
                let mut n = 1;
                while !taken.insert(name.clone()) {
                    name = self.output_name_for_stem(&format!("{}_{}", stem, n));
                    n += 1;
                }
                (file, name)
            })
            .collect()
    }

    pub async fn upscale_all(
        &self,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<UpscaleSummary, UpscaleError> {
        let files = StagingStore::list_files(input_dir).await?;
        debug!(count = files.len(), input = %input_dir.display(), "Upscaling batch");

        let mut outputs: Vec<String> = stream::iter(self.plan_outputs(files))
            .map(|(file, output_name)| self.upscale_one(file, output_name, input_dir, output_dir))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        outputs.sort();
        Ok(UpscaleSummary { outputs })
    }

    async fn upscale_one(
        &self,
        file: String,
        output_name: String,
        input_dir: &Path,
        output_dir: &Path,
    ) -> Result<String, UpscaleError> {
        let input = input_dir.join(&file);
        let output = output_dir.join(&output_name);

        let started = Instant::now();
        if let Err(e) = self.upscaler.upscale(&input, &output).await {
            metrics::UPSCALES_TOTAL
                .with_label_values(&[e.result_label()])
                .inc();
            warn!(file = %file, upscaler = self.upscaler.name(), error = %e, "Upscale failed");
            return Err(e);
        }
        metrics::UPSCALE_DURATION.observe(started.elapsed().as_secs_f64());
        metrics::UPSCALES_TOTAL.with_label_values(&["success"]).inc();

        match tokio::fs::remove_file(&input).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(UpscaleError::Io(e)),
        }

        debug!(file = %file, output = %output_name, "Input consumed");
        Ok(output_name)
    }
}
