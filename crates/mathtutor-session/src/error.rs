//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No authentication token")]
    NoToken,

    /// The backend reported the session as superseded by another login.
    /// Already handled (session cleared, redirect scheduled) when returned.
    #[error("SESSION_INVALID")]
    SessionInvalid,

    /// The backend reported the account as banned. Already handled.
    #[error("USER_BANNED")]
    UserBanned,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] mathtutor_storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// True for the two distinguished signals whose consequences the
    /// manager has already dealt with. Callers should just bail out.
    pub fn is_handled(&self) -> bool {
        matches!(self, SessionError::SessionInvalid | SessionError::UserBanned)
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Network(err.to_string())
    }
}
