use std::fmt;

use thiserror::Error;

/// Failures of the post-data fetch collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid tweet URL format: {0}")]
    InvalidReference(String),

    #[error("Invalid ScrapeCreators API key")]
    InvalidCredential,

    #[error("ScrapeCreators API key lacks permissions or rate limited")]
    RateLimited,

    #[error("Tweet not found or URL invalid")]
    NotFound,

    #[error("ScrapeCreators API error: {0}")]
    Unknown(String),
}

/// Failures of the reply generation collaborator.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Gemini API key rejected ({status})")]
    InvalidCredential { status: u16 },

    #[error("Could not extract reply from Gemini API response")]
    MalformedResponse,

    #[error("Gemini API request failed: {0}")]
    Unknown(String),
}

/// Failures while driving the page's compose surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("reply button not found for this post")]
    ReplyButtonNotFound,

    #[error("compose box did not appear after {attempts} checks")]
    ComposeNotFound { attempts: u32 },

    #[error("could not insert text into the compose box")]
    InsertRejected,

    #[error("submit button did not become available after {attempts} checks")]
    SubmitNotFound { attempts: u32 },
}

/// Coarse failure classes used for logging and the per-item trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    CredentialMissing,
    InputInvalid,
    RemoteUnavailable,
    UiTransient,
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureClass::CredentialMissing => "credential_missing",
            FailureClass::InputInvalid => "input_invalid",
            FailureClass::RemoteUnavailable => "remote_unavailable",
            FailureClass::UiTransient => "ui_transient",
        };
        f.write_str(name)
    }
}

/// Anything that can fail one single-item action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("missing API credential: {0}")]
    CredentialMissing(&'static str),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl ActionError {
    pub fn class(&self) -> FailureClass {
        match self {
            ActionError::CredentialMissing(_) => FailureClass::CredentialMissing,
            ActionError::Fetch(FetchError::InvalidReference(_)) => FailureClass::InputInvalid,
            ActionError::Fetch(_) | ActionError::Generate(_) => FailureClass::RemoteUnavailable,
            ActionError::Compose(_) => FailureClass::UiTransient,
        }
    }

    /// User-facing message naming the likely cause, shown outside bulk mode.
    pub fn notice(&self) -> String {
        let cause = match self {
            ActionError::CredentialMissing(which) => {
                format!("{} API key is missing. Add it to the config file or environment.", which)
            }
            ActionError::Fetch(FetchError::InvalidCredential)
            | ActionError::Generate(GenerateError::InvalidCredential { .. }) => {
                "Invalid API key. Please check your API keys.".to_string()
            }
            ActionError::Fetch(FetchError::RateLimited) => {
                "API rate limit exceeded. Please try again later.".to_string()
            }
            ActionError::Fetch(FetchError::InvalidReference(_)) => {
                "Could not extract valid tweet URL. Please try a different tweet.".to_string()
            }
            ActionError::Fetch(FetchError::NotFound) => {
                "Tweet not found or may be private/deleted.".to_string()
            }
            ActionError::Compose(e) => format!("Could not reach the reply box: {}.", e),
            other => other.to_string(),
        };
        format!("Error generating AI reply: {}", cause)
    }
}
