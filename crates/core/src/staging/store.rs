//! Filesystem staging store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use super::error::StagingError;

const INPUT_DIR: &str = "input";
const OUTPUT_DIR: &str = "output";

/// Paths of a job's staging directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDirs {
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Manages job directory trees under a common root.
#[derive(Debug, Clone)]
pub struct StagingStore {
    root: PathBuf,
}

impl StagingStore {
    /// Creates a store rooted at `root`. Nothing is created on disk yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory under which job trees live.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory layout for a job without touching the disk.
    pub fn dirs(&self, job_id: &str) -> JobDirs {
        let root = self.root.join(job_id);
        JobDirs {
            input: root.join(INPUT_DIR),
            output: root.join(OUTPUT_DIR),
            root,
        }
    }

    /// Creates `{root}/{id}/input` and `{root}/{id}/output`.
    ///
    /// Idempotent: existing directories are left as they are.
    pub async fn create_job_tree(&self, job_id: &str) -> Result<JobDirs, StagingError> {
        let dirs = self.dirs(job_id);
        for dir in [&dirs.input, &dirs.output] {
            fs::create_dir_all(dir)
                .await
                .map_err(|source| StagingError::CreateFailed {
                    path: dir.clone(),
                    source,
                })?;
        }
        debug!(job_id = %job_id, path = %dirs.root.display(), "Created job tree");
        Ok(dirs)
    }

    /// Recursively removes `{root}/{id}`. Succeeds if it is already absent.
    pub async fn remove_job_tree(&self, job_id: &str) -> Result<(), StagingError> {
        remove_dir_if_present(&self.dirs(job_id).root).await
    }

    /// Recursively removes `{root}/{id}/input`. Succeeds if it is already absent.
    pub async fn remove_input(&self, job_id: &str) -> Result<(), StagingError> {
        remove_dir_if_present(&self.dirs(job_id).input).await
    }

    /// Returns the names of the regular files in `dir`, sorted by name.
    ///
    /// A missing directory is reported as an empty list, not an error.
    pub async fn list_files(dir: &Path) -> Result<Vec<String>, StagingError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StagingError::ListFailed {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                // Directory removed mid-listing
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(source) => {
                    return Err(StagingError::ListFailed {
                        path: dir.to_path_buf(),
                        source,
                    })
                }
            };

            let is_file = match entry.file_type().await {
                Ok(file_type) => file_type.is_file(),
                Err(_) => false,
            };
            if is_file {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Number of files still staged in the job's input directory (0 if absent).
    pub async fn remaining(&self, job_id: &str) -> Result<usize, StagingError> {
        Ok(Self::list_files(&self.dirs(job_id).input).await?.len())
    }

    /// Sorted names of the job's output files (empty if absent).
    pub async fn output_files(&self, job_id: &str) -> Result<Vec<String>, StagingError> {
        Self::list_files(&self.dirs(job_id).output).await
    }

    /// Resolves an artifact in the job's output directory.
    ///
    /// Returns `Ok(None)` when the file does not exist, and an error when the
    /// name could address anything other than a direct child of `output/`.
    pub async fn output_file(
        &self,
        job_id: &str,
        file_name: &str,
    ) -> Result<Option<PathBuf>, StagingError> {
        if !is_plain_file_name(job_id) {
            return Err(StagingError::InvalidFileName(job_id.to_string()));
        }
        if !is_plain_file_name(file_name) {
            return Err(StagingError::InvalidFileName(file_name.to_string()));
        }

        let path = self.dirs(job_id).output.join(file_name);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StagingError::ListFailed { path, source }),
        }
    }
}

/// A name that is a single normal path component.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

async fn remove_dir_if_present(path: &Path) -> Result<(), StagingError> {
    match fs::remove_dir_all(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StagingError::RemoveFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}
