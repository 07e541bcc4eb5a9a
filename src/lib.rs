//! Session and API client SDK for the Hearth home-services marketplace.
//!
//! Provides the client half of the marketplace's authentication: decoding
//! access tokens into a user identity, persisting the credential pair, and
//! transparently refreshing it when the backend answers 401.
//!
//! # Quick Start
//!
//! ```no_run
//! use hearth::prelude::*;
//!
//! # async fn example() -> hearth::error::Result<()> {
//! let config = HearthConfig::from_env()?;
//! let session = Session::from_config(&config)?;
//! if !session.is_authenticated() {
//!     session.login("dana@example.com", "hunter2").await?;
//! }
//! let services: serde_json::Value = session.client().get("/services").await?;
//! println!("{services}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
