//! GitHub OAuth2 provider (no OIDC): token exchange, then the user API, and
//! team slugs when a team policy is configured.

use super::{IdpError, exchange_code, fetch_userinfo, str_claim};
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
    if tokens.access_token.is_empty() {
        return Err(IdpError::MalformedResponse(
            "token endpoint returned no access_token",
        ));
    }

    let user_url = config
        .oauth
        .user_info_url
        .as_deref()
        .ok_or(IdpError::MalformedResponse(
            "github provider requires oauth.user_info_url",
        ))?;
    let profile = fetch_userinfo(http, user_url, &tokens.access_token).await?;
    let mut user = map_user(&profile)?;

    // Team memberships are only needed for the team whitelist policy.
    if !config.team_whitelist.is_empty() {
        let teams_url = format!("{}/teams", user_url.trim_end_matches('/'));
        let response = http
            .get(&teams_url)
            .bearer_auth(&tokens.access_token)
            .send()
            .await?;
        if response.status().is_success() {
            let teams: Vec<Value> = response
                .json()
                .await
                .map_err(|_| IdpError::MalformedResponse("teams response is not a JSON array"))?;
            user.team_memberships = map_teams(&teams);
        } else {
            debug!("github teams lookup returned {}", response.status());
        }
    }

    debug!("github identity: {}", user.username);

    let ptokens = PTokens {
        access_token: tokens.access_token,
        id_token: tokens.id_token,
    };
    Ok((user, profile, ptokens))
}

fn map_user(profile: &Map<String, Value>) -> Result<User, IdpError> {
    let username = str_claim(profile, "login").ok_or(IdpError::MissingUsername)?;
    let email = str_claim(profile, "email").unwrap_or_default();
    let mut user = User::new(username, email);
    user.name = str_claim(profile, "name");
    Ok(user)
}

/// `org/team-slug` for each membership, falling back to the bare slug when
/// the organization is absent from the payload.
fn map_teams(teams: &[Value]) -> Vec<String> {
    teams
        .iter()
        .filter_map(|team| {
            let slug = team.get("slug").and_then(Value::as_str)?;
            let org = team
                .get("organization")
                .and_then(|org| org.get("login"))
                .and_then(Value::as_str);
            Some(match org {
                Some(org) => format!("{org}/{slug}"),
                None => slug.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_maps_to_username() -> Result<(), IdpError> {
        let profile = json!({
            "login": "alice",
            "email": "alice@example.com",
            "name": "Alice",
        });
        let user = map_user(profile.as_object().expect("object"))?;
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.name.as_deref(), Some("Alice"));
        Ok(())
    }

    #[test]
    fn missing_login_is_fatal() {
        let profile = json!({ "email": "alice@example.com" });
        assert!(matches!(
            map_user(profile.as_object().expect("object")),
            Err(IdpError::MissingUsername)
        ));
    }

    #[test]
    fn teams_render_as_org_slash_slug() {
        let teams = vec![
            json!({ "slug": "ops", "organization": { "login": "acme" } }),
            json!({ "slug": "plain" }),
            json!({ "name": "no slug here" }),
        ];
        assert_eq!(map_teams(&teams), vec!["acme/ops", "plain"]);
    }
}
