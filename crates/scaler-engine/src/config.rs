//! Engine timing configuration

use std::time::Duration;

/// Timing constants used by the stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Requeue after a normal cycle
    pub steady_requeue: Duration,
    /// Requeue after a recoverable failure
    pub error_requeue: Duration,
    /// Added to the end of a finished one-shot window before looking again
    pub run_once_grace: Duration,
    /// Attempts for finalizer and status writes that hit conflicts
    pub status_update_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            steady_requeue: Duration::from_secs(300),
            error_requeue: Duration::from_secs(30),
            run_once_grace: Duration::from_secs(60),
            status_update_retries: 5,
        }
    }
}
