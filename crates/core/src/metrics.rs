//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job lifecycle (status transitions, end-to-end duration)
//! - Downloads and upscales
//! - Admission queue occupancy

use once_cell::sync::Lazy;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
};

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs entering each status.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("imgup_jobs_total", "Jobs entering each status"),
        &["status"], // "pending", "running", "completed", "failed"
    )
    .unwrap()
});

/// Time from admission to a terminal status.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("imgup_job_duration_seconds", "Duration of job pipelines")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0, 1800.0]),
        &["status"],
    )
    .unwrap()
});

// =============================================================================
// Stage Metrics
// =============================================================================

/// Downloads by result.
pub static DOWNLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("imgup_downloads_total", "Total image downloads"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Bytes written by downloads.
pub static DOWNLOAD_BYTES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("imgup_download_bytes_total", "Total bytes downloaded").unwrap()
});

/// Upscaler invocations by result.
pub static UPSCALES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("imgup_upscales_total", "Total upscaler invocations"),
        &["result"], // "success", "failed", "timeout"
    )
    .unwrap()
});

/// Upscaler wall time per image.
pub static UPSCALE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "imgup_upscale_duration_seconds",
            "Duration of single-image upscales",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
    )
    .unwrap()
});

// =============================================================================
// Admission Queue Metrics
// =============================================================================

/// Jobs waiting for an admission slot.
pub static ADMISSION_QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "imgup_admission_queue_depth",
        "Jobs waiting for an admission slot",
    )
    .unwrap()
});

/// Jobs currently holding an admission slot.
pub static ADMISSION_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("imgup_admission_active", "Jobs currently running").unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_DURATION.clone()),
        // Stages
        Box::new(DOWNLOADS_TOTAL.clone()),
        Box::new(DOWNLOAD_BYTES.clone()),
        Box::new(UPSCALES_TOTAL.clone()),
        Box::new(UPSCALE_DURATION.clone()),
        // Queue
        Box::new(ADMISSION_QUEUE_DEPTH.clone()),
        Box::new(ADMISSION_ACTIVE.clone()),
    ]
}
