use std::fmt;

use serde::{Deserialize, Serialize};

/// Access + refresh token pair. Both halves are always present.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    /// Pair two optional tokens, rejecting a missing or blank half.
    pub fn from_parts(access_token: Option<&str>, refresh_token: Option<&str>) -> Option<Self> {
        let access_token = non_blank(access_token)?;
        let refresh_token = non_blank(refresh_token)?;
        Some(Self {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        })
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &"[redacted]")
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
