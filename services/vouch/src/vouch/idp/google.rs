//! Google OAuth2 / OpenID Connect provider. Google issues an OIDC id_token;
//! the account email doubles as the stable username.

use super::{IdpError, exchange_code, jwt_payload, str_claim};
use crate::vouch::config::Config;
use crate::vouch::types::{CustomClaims, User};
use serde_json::{Map, Value};
use session_token::PTokens;
use tracing::debug;

pub(super) async fn get_user_info(
    http: &reqwest::Client,
    config: &Config,
    code: &str,
    code_verifier: Option<&str>,
) -> Result<(User, CustomClaims, PTokens), IdpError> {
    let tokens = exchange_code(http, config, code, code_verifier, &[]).await?;
    if tokens.id_token.is_empty() {
        return Err(IdpError::MalformedResponse(
            "token endpoint returned no id_token",
        ));
    }

    let claims = jwt_payload(&tokens.id_token)?;
    let user = map_user(&claims)?;
    debug!("google identity: {}", user.username);

    let ptokens = PTokens {
        access_token: tokens.access_token,
        id_token: tokens.id_token,
    };
    Ok((user, claims, ptokens))
}

fn map_user(claims: &Map<String, Value>) -> Result<User, IdpError> {
    let email = str_claim(claims, "email").unwrap_or_default();
    let username = if email.is_empty() {
        str_claim(claims, "sub").ok_or(IdpError::MissingUsername)?
    } else {
        email.clone()
    };

    let mut user = User::new(username, email);
    user.name = str_claim(claims, "name");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Map<String, Value> {
        value.as_object().expect("test claims object").clone()
    }

    #[test]
    fn email_is_the_username() -> Result<(), IdpError> {
        let user = map_user(&claims(json!({
            "sub": "10769150350006150715113082367",
            "email": "alice@gmail.com",
            "name": "Alice",
        })))?;
        assert_eq!(user.username, "alice@gmail.com");
        assert_eq!(user.email, "alice@gmail.com");
        Ok(())
    }

    #[test]
    fn sub_backfills_missing_email() -> Result<(), IdpError> {
        let user = map_user(&claims(json!({ "sub": "12345" })))?;
        assert_eq!(user.username, "12345");
        assert!(user.email.is_empty());
        Ok(())
    }

    #[test]
    fn empty_claims_are_fatal() {
        assert!(matches!(
            map_user(&claims(json!({}))),
            Err(IdpError::MissingUsername)
        ));
    }
}
