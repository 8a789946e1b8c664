//! Active Directory Federation Services provider.
//!
//! ADFS wants a `resource` parameter on the token exchange and frequently
//! omits the `email` claim; when the `upn` looks like an email it stands in
//! for it.

use super::{IdpError, exchange_code, jwt_payload, str_claim};
use crate::vouch::authz::is_email_valid;
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
    let resource = config.oauth.callback_url.clone();
    let extra = [("resource", resource.as_str())];
    let tokens = exchange_code(http, config, code, code_verifier, &extra).await?;
    if tokens.id_token.is_empty() {
        return Err(IdpError::MalformedResponse(
            "token endpoint returned no id_token",
        ));
    }

    let claims = jwt_payload(&tokens.id_token)?;
    let user = map_user(&claims)?;
    debug!("adfs identity: {}", user.username);

    let ptokens = PTokens {
        access_token: tokens.access_token,
        id_token: tokens.id_token,
    };
    Ok((user, claims, ptokens))
}

fn map_user(claims: &Map<String, Value>) -> Result<User, IdpError> {
    let upn = str_claim(claims, "upn").ok_or(IdpError::MissingUsername)?;

    // The username is the UPN's local part.
    let username = upn.split('@').next().unwrap_or(&upn).to_string();
    if username.is_empty() {
        return Err(IdpError::MissingUsername);
    }

    let mut email = str_claim(claims, "email").unwrap_or_default();
    if email.is_empty() && is_email_valid(&upn) {
        email = upn;
    }

    let mut user = User::new(username, email);
    user.name = str_claim(claims, "unique_name");
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
    fn upn_fallback_fills_empty_email() -> Result<(), IdpError> {
        let user = map_user(&claims(json!({
            "upn": "carol@corp.local",
            "email": "",
        })))?;
        assert_eq!(user.username, "carol");
        assert_eq!(user.email, "carol@corp.local");
        Ok(())
    }

    #[test]
    fn explicit_email_is_kept() -> Result<(), IdpError> {
        let user = map_user(&claims(json!({
            "upn": "carol@corp.local",
            "email": "carol@example.com",
        })))?;
        assert_eq!(user.email, "carol@example.com");
        Ok(())
    }

    #[test]
    fn non_email_upn_leaves_email_empty() -> Result<(), IdpError> {
        let user = map_user(&claims(json!({ "upn": "CORP\\carol" })))?;
        assert_eq!(user.username, "CORP\\carol");
        assert!(user.email.is_empty());
        Ok(())
    }

    #[test]
    fn missing_upn_is_fatal() {
        assert!(matches!(
            map_user(&claims(json!({ "email": "carol@example.com" }))),
            Err(IdpError::MissingUsername)
        ));
    }
}
