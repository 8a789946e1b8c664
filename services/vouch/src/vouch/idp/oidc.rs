//! Generic OpenID Connect provider: authorization-code exchange, id_token
//! claims, optional userinfo endpoint merge.

use super::{IdpError, exchange_code, fetch_userinfo, jwt_payload, str_claim};
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

    let mut claims = jwt_payload(&tokens.id_token)?;

    // The userinfo endpoint, when configured, is authoritative for profile
    // fields; its claims override the id_token's.
    if let Some(url) = &config.oauth.user_info_url
        && !tokens.access_token.is_empty()
    {
        let userinfo = fetch_userinfo(http, url, &tokens.access_token).await?;
        for (key, value) in userinfo {
            claims.insert(key, value);
        }
    }

    let user = map_user(&claims)?;
    debug!("oidc identity: {}", user.username);

    let ptokens = PTokens {
        access_token: tokens.access_token,
        id_token: tokens.id_token,
    };
    Ok((user, claims, ptokens))
}

fn map_user(claims: &Map<String, Value>) -> Result<User, IdpError> {
    let email = str_claim(claims, "email").unwrap_or_default();
    let username = str_claim(claims, "preferred_username")
        .or_else(|| {
            if email.is_empty() {
                None
            } else {
                Some(email.clone())
            }
        })
        .or_else(|| str_claim(claims, "sub"))
        .ok_or(IdpError::MissingUsername)?;

    let mut user = User::new(username, email);
    user.name = str_claim(claims, "name");
    Ok(user)
}
