use crate::cli::actions::{Action, server::Args};
use crate::vouch::config::Config;
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;

fn many(matches: &clap::ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn one(matches: &clap::ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

/// Assemble the immutable [`Config`] and server action from parsed
/// arguments.
///
/// # Errors
///
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let mut config = Config::default();

    config.listen = one(matches, "listen")?;
    config.port = matches.get_one::<u16>("port").copied().unwrap_or(9090);

    config.domains = many(matches, "domains");
    config.whitelist = many(matches, "whitelist");
    config.team_whitelist = many(matches, "team-whitelist");
    config.allow_all_users = matches.get_flag("allow-all-users");
    config.case_insensitive_emails = matches.get_flag("case-insensitive-emails");
    config.case_insensitive_email_domains = many(matches, "case-insensitive-email-domains");
    config.post_logout_redirect_uris = many(matches, "post-logout-redirect-uris");
    config.testing = matches.get_flag("testing");

    config.jwt.issuer = one(matches, "jwt-issuer")?;
    config.jwt.max_age_minutes = matches
        .get_one::<i64>("jwt-max-age")
        .copied()
        .unwrap_or(config.jwt.max_age_minutes);
    config.jwt.signing_method = one(matches, "jwt-signing-method")?
        .parse()
        .map_err(|err: String| anyhow!(err))?;

    config.cookie.name = one(matches, "cookie-name")?;
    config.cookie.domain = matches.get_one::<String>("cookie-domain").cloned();
    config.cookie.secure = matches.get_flag("cookie-secure");
    config.cookie.http_only = matches
        .get_one::<bool>("cookie-http-only")
        .copied()
        .unwrap_or(true);
    config.cookie.same_site = one(matches, "cookie-same-site")?
        .parse()
        .map_err(|err: String| anyhow!(err))?;
    config.cookie.max_age_seconds = matches
        .get_one::<i64>("cookie-max-age")
        .copied()
        .unwrap_or(config.jwt.max_age_minutes * 60);

    config.oauth.provider = one(matches, "oauth-provider")?;
    config.oauth.client_id = one(matches, "oauth-client-id")?;
    config.oauth.client_secret = matches
        .get_one::<String>("oauth-client-secret")
        .map(|secret| SecretString::from(secret.clone()));
    config.oauth.auth_url = one(matches, "oauth-auth-url")?;
    config.oauth.token_url = one(matches, "oauth-token-url")?;
    config.oauth.user_info_url = matches.get_one::<String>("oauth-user-info-url").cloned();
    config.oauth.scopes = many(matches, "oauth-scopes");
    config.oauth.callback_url = one(matches, "oauth-callback-url")?;
    config.oauth.code_challenge_method = matches
        .get_one::<String>("oauth-code-challenge-method")
        .cloned();

    Ok(Action::Server(Args {
        config,
        jwt_secret: matches
            .get_one::<String>("jwt-secret")
            .map(|secret| SecretString::from(secret.clone())),
        jwt_private_key: matches.get_one::<String>("jwt-private-key").cloned(),
        jwt_public_key: matches.get_one::<String>("jwt-public-key").cloned(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use crate::vouch::config::{SameSite, SigningMethod};

    fn action(argv: &[&str]) -> Result<Action> {
        handler(&commands::new().get_matches_from(argv))
    }

    const MINIMAL: [&str; 9] = [
        "vouch",
        "--oauth-client-id",
        "client-1",
        "--oauth-auth-url",
        "https://idp.example.com/authorize",
        "--oauth-token-url",
        "https://idp.example.com/token",
        "--oauth-callback-url",
        "https://vouch.example.com/auth",
    ];

    #[test]
    fn minimal_args_produce_default_config() -> Result<()> {
        let Action::Server(args) = action(&MINIMAL)?;
        let config = args.config;
        assert_eq!(config.port, 9090);
        assert_eq!(config.listen, "0.0.0.0");
        assert_eq!(config.jwt.issuer, "Vouch");
        assert_eq!(config.jwt.signing_method, SigningMethod::Hs256);
        assert_eq!(config.cookie.name, "VouchCookie");
        assert_eq!(config.cookie.same_site, SameSite::Lax);
        assert!(config.cookie.http_only);
        assert_eq!(config.cookie.max_age_seconds, 240 * 60);
        assert_eq!(config.oauth.client_id, "client-1");
        assert!(args.jwt_secret.is_none());
        Ok(())
    }

    #[test]
    fn policy_and_cookie_args_are_mapped() -> Result<()> {
        let mut argv = MINIMAL.to_vec();
        argv.extend([
            "--domains",
            "example.com,example.org",
            "--whitelist",
            "alice@example.com",
            "--cookie-same-site",
            "strict",
            "--cookie-secure",
            "--jwt-max-age",
            "60",
        ]);
        let Action::Server(args) = action(&argv)?;
        let config = args.config;
        assert_eq!(config.domains, ["example.com", "example.org"]);
        assert_eq!(config.whitelist, ["alice@example.com"]);
        assert_eq!(config.cookie.same_site, SameSite::Strict);
        assert!(config.cookie.secure);
        // cookie lifetime follows the shortened token lifetime
        assert_eq!(config.cookie.max_age_seconds, 60 * 60);
        Ok(())
    }

    #[test]
    fn explicit_cookie_max_age_wins() -> Result<()> {
        let mut argv = MINIMAL.to_vec();
        argv.extend(["--cookie-max-age", "3600", "--jwt-max-age", "240"]);
        let Action::Server(args) = action(&argv)?;
        assert_eq!(args.config.cookie.max_age_seconds, 3600);
        Ok(())
    }

    #[test]
    fn pkce_method_is_optional() -> Result<()> {
        let mut argv = MINIMAL.to_vec();
        argv.extend(["--oauth-code-challenge-method", "S256"]);
        let Action::Server(args) = action(&argv)?;
        assert_eq!(
            args.config.oauth.code_challenge_method.as_deref(),
            Some("S256")
        );
        Ok(())
    }
}
