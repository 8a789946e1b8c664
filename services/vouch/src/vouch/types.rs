//! Identity records produced by the IdP adapters and consumed by the
//! authorization engine and the token manager.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open mapping from claim name to arbitrary JSON value, carried through the
/// session token for downstream applications.
pub type CustomClaims = Map<String, Value>;

/// The authenticated identity as reported by the IdP.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub team_memberships: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sites: Vec<String>,
}

impl User {
    #[must_use]
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            ..Self::default()
        }
    }
}
