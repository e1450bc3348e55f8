use thiserror::Error;

/// Reasons a bulk session cannot start or keep running.
///
/// Per-item failures never show up here: they are absorbed at the tick
/// boundary and only mark their item as handled.
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("Please set your API keys first (missing: {})", .missing.join(", "))]
    CredentialMissing { missing: Vec<&'static str> },

    #[error("bulk session already running")]
    AlreadyRunning,
}
