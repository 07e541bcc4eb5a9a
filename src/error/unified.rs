//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    NotFound,
    RateLimit,
    Network,
    Server,
    Api,
    Configuration,
    Serialization,
    Unknown,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    RetryWithBackoff,
    SignInAgain,
    CheckPermissions,
    CheckConfiguration,
    FixRequest,
    ContactSupport,
}

impl ErrorCategory {
    /// Category for a non-success HTTP status.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::Authorization,
            404 => Self::NotFound,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Api,
        }
    }
}

impl RecoverySuggestion {
    pub fn for_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Authentication => Self::SignInAgain,
            ErrorCategory::Authorization => Self::CheckPermissions,
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server => {
                Self::RetryWithBackoff
            }
            ErrorCategory::Configuration => Self::CheckConfiguration,
            ErrorCategory::Api | ErrorCategory::NotFound => Self::FixRequest,
            ErrorCategory::Serialization | ErrorCategory::Unknown => Self::ContactSupport,
        }
    }

    /// One-line guidance shown to a person at a terminal.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::RetryWithBackoff => "The backend is busy or unreachable; try again shortly.",
            Self::SignInAgain => "Sign in again with `hearth auth login`.",
            Self::CheckPermissions => "This account's role does not allow that action.",
            Self::CheckConfiguration => "Check HEARTH_API_URL and the other HEARTH_* settings.",
            Self::FixRequest => "Check the request path and parameters.",
            Self::ContactSupport => "The backend sent something unexpected; contact support if it persists.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_categories() {
        assert_eq!(ErrorCategory::from_status(401), ErrorCategory::Authentication);
        assert_eq!(ErrorCategory::from_status(404), ErrorCategory::NotFound);
        assert_eq!(ErrorCategory::from_status(502), ErrorCategory::Server);
        assert_eq!(ErrorCategory::from_status(409), ErrorCategory::Api);
    }

    #[test]
    fn sign_in_hint_names_the_login_command() {
        let suggestion = RecoverySuggestion::for_category(ErrorCategory::Authentication);
        assert_eq!(suggestion, RecoverySuggestion::SignInAgain);
        assert!(suggestion.hint().contains("hearth auth login"));
    }
}
