//! Access-token decoding into a user [`Identity`].
//!
//! Tokens are JWTs issued by the marketplace backend. Only the payload segment
//! is read; signature verification is the backend's job. Different backend
//! versions name the same claim differently, so each identity field is looked
//! up through an ordered [`ClaimField`] list and the first usable value wins.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

use super::error::AuthError;

/// Decoded JWT payload.
pub type Claims = Map<String, Value>;

/// A named identity field and the claim keys that may carry it, in priority order.
#[derive(Debug, Clone, Copy)]
pub struct ClaimField {
    pub label: &'static str,
    pub keys: &'static [&'static str],
}

/// User identifier. A token without any of these keys has no identity.
pub const IDENTIFIER: ClaimField = ClaimField {
    label: "identifier",
    keys: &[
        "id",
        "userId",
        "user_id",
        "sub",
        "nameid",
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier",
    ],
};

pub const NAME: ClaimField = ClaimField {
    label: "name",
    keys: &[
        "name",
        "unique_name",
        "fullName",
        "given_name",
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name",
    ],
};

pub const EMAIL: ClaimField = ClaimField {
    label: "email",
    keys: &[
        "email",
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
    ],
};

pub const ROLE: ClaimField = ClaimField {
    label: "role",
    keys: &[
        "role",
        "roles",
        "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
    ],
};

pub const AVATAR: ClaimField = ClaimField {
    label: "avatar",
    keys: &["avatar", "picture"],
};

impl ClaimField {
    /// Return the first usable value among this field's keys.
    pub fn extract(&self, claims: &Claims) -> Option<String> {
        self.keys
            .iter()
            .find_map(|key| claims.get(*key).and_then(claim_text))
    }
}

/// Marketplace account role.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    #[default]
    Customer,
    Provider,
    Staff,
    Manager,
    Admin,
    /// Role name the client does not know about.
    #[strum(default, transparent)]
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        self.as_ref()
    }

    /// Staff, managers and admins can reach the back-office screens.
    pub fn is_back_office(&self) -> bool {
        matches!(self, Self::Staff | Self::Manager | Self::Admin)
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        raw.parse().unwrap_or(Self::Other(raw))
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

/// User profile projected from access-token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Build an identity from decoded claims.
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        let id = IDENTIFIER
            .extract(claims)
            .ok_or(AuthError::MissingIdentifier)?;
        let role = ROLE
            .extract(claims)
            .map(Role::from)
            .unwrap_or_default();
        Ok(Self {
            id,
            name: NAME.extract(claims).unwrap_or_default(),
            email: EMAIL.extract(claims).unwrap_or_default(),
            role,
            avatar: AVATAR.extract(claims),
            expires_at: claims
                .get("exp")
                .and_then(|exp| exp.as_i64().or_else(|| exp.as_f64().map(|secs| secs as i64)))
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }

    /// Whether the token expires within `skew` of `now`.
    ///
    /// A skew reaching past the representable range counts as due.
    pub fn expires_within(&self, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
        self.expires_at.is_some_and(|exp| {
            exp.checked_sub_signed(skew)
                .map_or(true, |refresh_at| refresh_at <= now)
        })
    }
}

/// Decode the payload segment of a JWT.
pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let mut parts = token.trim().split('.');
    let _header = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::MalformedToken("missing header".into()))?;
    let payload = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AuthError::MalformedToken("missing payload".into()))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| AuthError::MalformedToken("payload is not base64url".into()))?;
    match serde_json::from_slice::<Value>(&decoded) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(AuthError::MalformedToken("payload is not a JSON object".into())),
        Err(_) => Err(AuthError::MalformedToken("payload is not JSON".into())),
    }
}

/// Decode an access token into an identity.
///
/// Never fails: any decoding problem is logged and reported as `None`.
pub fn decode_identity(token: &str) -> Option<Identity> {
    match decode_claims(token).and_then(|claims| Identity::from_claims(&claims)) {
        Ok(identity) => Some(identity),
        Err(err) => {
            tracing::warn!(error = %err, "Access token did not decode to an identity");
            None
        }
    }
}

fn claim_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(claim_text),
        _ => None,
    }
}
