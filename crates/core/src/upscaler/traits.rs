//! Trait definitions for the upscaler module.

use async_trait::async_trait;
use std::path::Path;

use super::error::UpscaleError;

/// Produces an upscaled copy of one image.
#[async_trait]
pub trait Upscaler: Send + Sync {
    /// Returns the name of this upscaler implementation.
    fn name(&self) -> &str;

    /// Upscales `input` and writes the result to `output`.
    ///
    /// Dropping the returned future must stop any work it started.
    async fn upscale(&self, input: &Path, output: &Path) -> Result<(), UpscaleError>;

    /// Checks that the upscaler is usable.
    async fn validate(&self) -> Result<(), UpscaleError> {
        Ok(())
    }
}
