//! Access-token decoding, session storage, and the session lifecycle.

pub mod claims;
pub mod credential;
pub mod error;
pub mod session;
pub mod storage;

pub use claims::{decode_claims, decode_identity, ClaimField, Identity, Role};
pub use credential::CredentialPair;
pub use error::AuthError;
pub use session::{Session, SessionOptions, SessionState};
pub use storage::{CookieOptions, FileStorage, MemoryStorage, SessionStorage};
