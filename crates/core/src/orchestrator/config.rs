//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::admission::AdmissionConstraints;

/// Configuration for the conversion orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Which files are accepted as conversion input.
    #[serde(default)]
    pub admission: AdmissionConstraints,

    /// How long to wait for a file picker to deliver a selection (milliseconds).
    /// A picker that is closed without a choice never resolves, so this also
    /// bounds how long an abandoned selection is waited on.
    #[serde(default = "default_picker_check_delay")]
    pub picker_check_delay_ms: u64,

    /// Capacity of the session event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_picker_check_delay() -> u64 {
    60_000 // 1 minute
}

fn default_event_capacity() -> usize {
    256
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            admission: AdmissionConstraints::default(),
            picker_check_delay_ms: default_picker_check_delay(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl OrchestratorConfig {
    /// Replaces the admission constraints.
    pub fn with_admission(mut self, admission: AdmissionConstraints) -> Self {
        self.admission = admission;
        self
    }

    pub fn picker_check_delay(&self) -> Duration {
        Duration::from_millis(self.picker_check_delay_ms)
    }
}
