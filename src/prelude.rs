//! Convenience re-exports for common use.

pub use crate::auth::{AuthError, Identity, Role, Session, SessionState, SessionStorage};
pub use crate::client::{ApiClient, ApiRequest, SessionRecovery};
pub use crate::config::HearthConfig;
pub use crate::error::{HearthError, Result};
