//! Error types for the organize engine and its collaborators

use thiserror::Error;

/// Failure of a call to the remote organize service
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service rejected the bearer token (HTTP 401)
    #[error("unauthorized")]
    Unauthorized,

    /// Any other non-success status
    #[error("service error ({status}): {body}")]
    Service { status: u16, body: String },

    /// The request never completed
    #[error("network error: {0}")]
    Transport(String),

    /// The service answered but the body did not parse
    #[error("failed to parse response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Errors surfaced by the orchestrator. Each one has already been reflected
/// in the session status by the time the caller sees it.
#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Auth(String),

    #[error("network error: {0}")]
    Transport(String),

    #[error("service error: {0}")]
    Service(String),

    #[error("filesystem error: {0}")]
    Io(String),

    #[error("cannot {action} while {step}")]
    InvalidState { action: &'static str, step: String },

    /// The session was cancelled or replaced while this call was pending
    #[error("organize session changed, result discarded")]
    Stale,
}

impl OrganizeError {
    /// Map a remote failure that happened during analysis
    pub fn from_analysis(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => {
                OrganizeError::Auth("session expired, please sign in again".to_string())
            }
            ApiError::Service { status, body } => {
                OrganizeError::Service(format!("analysis failed ({}): {}", status, body))
            }
            ApiError::Decode(msg) => OrganizeError::Service(format!("analysis failed: {}", msg)),
            ApiError::Transport(msg) => OrganizeError::Transport(msg),
        }
    }
}

impl From<ApiError> for OrganizeError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => OrganizeError::Auth("session expired".to_string()),
            ApiError::Service { status, body } => {
                OrganizeError::Service(format!("{}: {}", status, body))
            }
            ApiError::Decode(msg) => OrganizeError::Service(msg),
            ApiError::Transport(msg) => OrganizeError::Transport(msg),
        }
    }
}

impl From<std::io::Error> for OrganizeError {
    fn from(err: std::io::Error) -> Self {
        OrganizeError::Io(err.to_string())
    }
}

// Convert OrganizeError to String for callers that only display messages
impl From<OrganizeError> for String {
    fn from(err: OrganizeError) -> String {
        err.to_string()
    }
}
