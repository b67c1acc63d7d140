//! Real-CUGAN (ncnn/Vulkan) subprocess upscaler.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::config::UpscalerConfig;

use super::error::UpscaleError;
use super::traits::Upscaler;

/// Keep at most this much stderr for error reports.
const STDERR_TAIL_BYTES: usize = 4096;

/// Upscaler that shells out to `realcugan-ncnn-vulkan`.
pub struct RealCuganUpscaler {
    executable: PathBuf,
    models_dir: PathBuf,
    scale: u8,
    denoise: i8,
    timeout_secs: u64,
}

impl RealCuganUpscaler {
    /// Creates an upscaler from configuration.
    pub fn new(config: &UpscalerConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            models_dir: config.models_dir.clone(),
            scale: config.scale,
            denoise: config.denoise,
            timeout_secs: config.timeout_secs,
        }
    }

    /// Builds the upscaler arguments for one image.
    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
            "-s".to_string(),
            self.scale.to_string(),
            "-n".to_string(),
            self.denoise.to_string(),
            "-m".to_string(),
            self.models_dir.to_string_lossy().to_string(),
        ]
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Last `STDERR_TAIL_BYTES` bytes of a stream, trimmed as it is fed.
#[derive(Debug, Default)]
struct StderrTail {
    buf: VecDeque<u8>,
}

impl StderrTail {
    fn push(&mut self, chunk: &[u8]) {
        let chunk = &chunk[chunk.len().saturating_sub(STDERR_TAIL_BYTES)..];
        let overflow = (self.buf.len() + chunk.len()).saturating_sub(STDERR_TAIL_BYTES);
        self.buf.drain(..overflow);
        self.buf.extend(chunk);
    }

    fn into_text(self) -> Option<String> {
        let bytes: Vec<u8> = self.buf.into();
        let text = String::from_utf8_lossy(&bytes).trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl Upscaler for RealCuganUpscaler {
    fn name(&self) -> &str {
        "realcugan"
    }

    async fn upscale(&self, input: &Path, output: &Path) -> Result<(), UpscaleError> {
        let args = self.build_args(input, output);
        let file = file_label(input);

        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    UpscaleError::ExecutableNotFound {
                        path: self.executable.clone(),
                    }
                } else {
                    UpscaleError::Io(e)
                }
            })?;

        let mut stderr = child.stderr.take();

        let result = timeout(Duration::from_secs(self.timeout_secs), async {
            let mut tail = StderrTail::default();
            if let Some(ref mut pipe) = stderr {
                let mut chunk = [0u8; 1024];
                loop {
                    let n = pipe.read(&mut chunk).await?;
                    if n == 0 {
                        break;
                    }
                    tail.push(&chunk[..n]);
                }
            }
            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, StderrTail), std::io::Error>((status, tail))
        })
        .await;

        match result {
            Ok(Ok((status, tail))) => {
                if !status.success() {
                    return Err(UpscaleError::process_failed(
                        file,
                        status.code(),
                        tail.into_text(),
                    ));
                }
            }
            Ok(Err(e)) => return Err(UpscaleError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(UpscaleError::Timeout {
                    file,
                    timeout_secs: self.timeout_secs,
                });
            }
        }

        if tokio::fs::metadata(output).await.is_err() {
            return Err(UpscaleError::OutputMissing {
                path: output.to_path_buf(),
            });
        }

        debug!(file = %file, output = %output.display(), "Upscaled");
        Ok(())
    }

    async fn validate(&self) -> Result<(), UpscaleError> {
        // Bare names are resolved through PATH at spawn time.
        if self.executable.components().count() > 1
            && !tokio::fs::try_exists(&self.executable).await?
        {
            return Err(UpscaleError::ExecutableNotFound {
                path: self.executable.clone(),
            });
        }

        match tokio::fs::metadata(&self.models_dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(UpscaleError::ModelsNotFound {
                path: self.models_dir.clone(),
            }),
        }
    }
}
