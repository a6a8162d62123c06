//! Error taxonomy shared by the network and app layers

use crate::constants::{MIN_PASSWORD_LEN, MIN_USERNAME_LEN};

/// Failure of a single backend call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// HTTP 401 anywhere. The session is no longer valid.
    #[error("session expired")]
    AuthExpired,
    /// Non-2xx with the server's `detail` (or a generic `HTTP {status}`)
    #[error("{detail}")]
    ServerRejected { status: u16, detail: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthExpired => Some(401),
            ApiError::ServerRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Transport(format!("request timed out: {}", e))
        } else if e.is_connect() {
            ApiError::Transport(format!("connection failed: {}", e))
        } else if e.is_decode() {
            ApiError::MalformedResponse(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Client-side form check that blocks a request from being sent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Username and password are required.")]
    MissingCredentials,
    #[error("Username is too short: it must be at least {} characters.", MIN_USERNAME_LEN)]
    UsernameTooShort,
    #[error("Password is too short: it must be at least {} characters.", MIN_PASSWORD_LEN)]
    PasswordTooShort,
    #[error("Please enter a new password.")]
    MissingPassword,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("You cannot delete your own account.")]
    SelfDeletion,
}
