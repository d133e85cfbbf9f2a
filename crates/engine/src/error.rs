use costplane_core::error::CoreError;
use costplane_services::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed option values. The module run does not proceed; the
    /// error is reported back for the administrator.
    #[error("Configuration error: {0}")]
    Configuration(#[from] CoreError),

    /// Data-store failure. Fatal for the current run; the scheduler
    /// retries at the next tick and no partial commit happens.
    #[error("Data store error: {0}")]
    Store(#[from] sqlx::Error),

    /// External lookup failure that escaped per-resource handling.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

impl EngineError {
    /// Configuration errors are skip-and-report; everything else aborts
    /// the run.
    pub fn is_configuration(&self) -> bool {
        matches!(self, EngineError::Configuration(_))
    }
}
