pub mod config;
pub mod fetcher;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod scraper;
pub mod staging;
pub mod testing;
pub mod upscaler;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, LogFormat, SanitizedConfig,
};
pub use fetcher::{build_http_client, BatchResult, FetchError, FetchStage, Fetcher, HttpFetcher};
pub use job::{
    CreateJobRequest, Job, JobError, JobResult, JobStatus, JobStore, JobUpdate, SqliteJobStore,
};
pub use orchestrator::{JobOrchestrator, OrchestratorError, RecoveryReport};
pub use queue::{AdmissionQueue, QueueError, QueueStatus};
pub use scraper::{HtmlPageScraper, PageScraper, ScrapeError, ScrapedPage};
pub use staging::{JobDirs, StagingError, StagingStore};
pub use upscaler::{RealCuganUpscaler, UpscaleError, UpscaleStage, UpscaleSummary, Upscaler};
