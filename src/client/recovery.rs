use async_trait::async_trait;

/// Capability the client calls when the backend rejects the bearer token.
///
/// Implementations try to obtain a fresh credential (and attach it to the
/// client) and report whether the failed request is worth retrying.
#[async_trait]
pub trait SessionRecovery: Send + Sync {
    async fn attempt_recovery(&self) -> bool;
}
