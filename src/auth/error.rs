use thiserror::Error;

use crate::error::{ErrorCategory, HearthError, RecoverySuggestion};

/// Authentication and session errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Malformed token: {0}")]
    MalformedToken(String),
    #[error("Token has no recognized identifier claim")]
    MissingIdentifier,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotLoggedIn | Self::MalformedToken(_) | Self::MissingIdentifier => {
                ErrorCategory::Authentication
            }
            Self::Rejected { status, .. } => ErrorCategory::from_status(*status),
            Self::Network(_) => ErrorCategory::Network,
            Self::Io(_) => ErrorCategory::Configuration,
            Self::InvalidResponse(_) | Self::Serialization(_) => ErrorCategory::Serialization,
        }
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        RecoverySuggestion::for_category(self.category())
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<HearthError> for AuthError {
    fn from(error: HearthError) -> Self {
        match error {
            HearthError::Api { status, message } => Self::Rejected { status, message },
            HearthError::Network(err) => Self::Network(err.to_string()),
            HearthError::Io(err) => Self::Io(err.to_string()),
            HearthError::Serialization(err) => Self::Serialization(err.to_string()),
            HearthError::InvalidResponse(msg) => Self::InvalidResponse(msg),
            other => Self::InvalidResponse(other.to_string()),
        }
    }
}

impl From<AuthError> for HearthError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Rejected { status, message } => HearthError::Api { status, message },
            AuthError::InvalidResponse(msg) => HearthError::InvalidResponse(msg),
            other => HearthError::Authentication(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_login_asks_to_sign_in_again() {
        let err = AuthError::Rejected {
            status: 401,
            message: "wrong password".to_string(),
        };
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::SignInAgain);
    }

    #[test]
    fn throttled_login_suggests_backoff() {
        let err = AuthError::Rejected {
            status: 429,
            message: "slow down".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::RateLimit);
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::RetryWithBackoff);
    }

    #[test]
    fn converting_to_hearth_error_keeps_the_status() {
        let err: HearthError = AuthError::Rejected {
            status: 403,
            message: "suspended".to_string(),
        }
        .into();
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.recovery_suggestion(), RecoverySuggestion::CheckPermissions);
    }
}
