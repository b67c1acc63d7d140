//! Per-job staging directories.
//!
//! Every admitted job owns `{root}/{id}/input` (downloaded sources waiting to
//! be upscaled) and `{root}/{id}/output` (upscaled artifacts).
//!
//! Absence is never an error here: listing a directory that does not exist
//! yields an empty list, and removing a tree that is already gone succeeds.
//! The orchestrator relies on this so that a job deleted while its pipeline
//! is running degrades into no-ops instead of failures.

mod error;
mod store;

pub use error::StagingError;
pub use store::{JobDirs, StagingStore};
