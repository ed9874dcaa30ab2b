use std::sync::Arc;
use ffmfy_core::{Config, ConversionEngine, ConversionOrchestrator, SanitizedConfig};

/// Orchestrator over whichever engine the server was started with.
pub type SharedOrchestrator = Arc<ConversionOrchestrator<dyn ConversionEngine>>;

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: SharedOrchestrator,
}

impl AppState {
    pub fn new(config: Config, orchestrator: SharedOrchestrator) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &SharedOrchestrator {
        &self.orchestrator
    }
}
