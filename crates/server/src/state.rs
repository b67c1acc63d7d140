use imgup_core::{Config, JobOrchestrator, JobStore, SanitizedConfig};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<JobOrchestrator>,
    job_store: Arc<dyn JobStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<JobOrchestrator>,
        job_store: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            job_store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<JobOrchestrator> {
        &self.orchestrator
    }

    pub fn job_store(&self) -> &dyn JobStore {
        self.job_store.as_ref()
    }
}
