use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Pass-through identity-provider tokens, optionally embedded in the session
/// token when the operator opts in. Discarded otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PTokens {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id_token: String,
}

impl PTokens {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.access_token.is_empty() && self.id_token.is_empty()
    }
}

/// Payload of the session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub username: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom_claims: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptokens: Option<PTokens>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// True when the token is inside the sliding-refresh window and the
    /// caller should re-issue a fresh cookie alongside the 200 response.
    ///
    /// Callers must only invoke this on claims that already passed
    /// verification; a token failing verification is never refreshed.
    #[must_use]
    pub fn needs_refresh(&self, now_unix_seconds: i64, refresh_window_seconds: i64) -> bool {
        self.exp - now_unix_seconds < refresh_window_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims() -> SessionClaims {
        SessionClaims {
            username: "alice".to_string(),
            custom_claims: Map::new(),
            ptokens: None,
            iss: "vouch".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_000_000 + 240 * 60,
        }
    }

    #[test]
    fn empty_optional_fields_are_skipped() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(claims())?;
        assert_eq!(
            value,
            json!({
                "username": "alice",
                "iss": "vouch",
                "iat": 1_700_000_000,
                "exp": 1_700_014_400,
            })
        );
        Ok(())
    }

    #[test]
    fn ptokens_survive_round_trip() -> Result<(), serde_json::Error> {
        let mut with_tokens = claims();
        with_tokens.ptokens = Some(PTokens {
            access_token: "at".to_string(),
            id_token: "idt".to_string(),
        });
        let value = serde_json::to_value(&with_tokens)?;
        let back: SessionClaims = serde_json::from_value(value)?;
        assert_eq!(back, with_tokens);
        Ok(())
    }

    #[test]
    fn needs_refresh_inside_window() {
        let claims = claims();
        // two minutes left, five minute window
        assert!(claims.needs_refresh(claims.exp - 120, 300));
    }

    #[test]
    fn no_refresh_outside_window() {
        let claims = claims();
        assert!(!claims.needs_refresh(claims.exp - 600, 300));
    }
}
