use clap::{Arg, Command, builder::PossibleValuesParser};

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("oauth-provider")
                .long("oauth-provider")
                .help("Identity provider flavor")
                .env("VOUCH_OAUTH_PROVIDER")
                .default_value("oidc")
                .value_parser(PossibleValuesParser::new([
                    "oidc", "openid", "adfs", "github", "google",
                ])),
        )
        .arg(
            Arg::new("oauth-client-id")
                .long("oauth-client-id")
                .help("OAuth2 client id registered with the IdP")
                .env("VOUCH_OAUTH_CLIENT_ID")
                .required(true),
        )
        .arg(
            Arg::new("oauth-client-secret")
                .long("oauth-client-secret")
                .help("OAuth2 client secret (omit for public PKCE clients)")
                .env("VOUCH_OAUTH_CLIENT_SECRET"),
        )
        .arg(
            Arg::new("oauth-auth-url")
                .long("oauth-auth-url")
                .help("IdP authorization endpoint")
                .env("VOUCH_OAUTH_AUTH_URL")
                .required(true),
        )
        .arg(
            Arg::new("oauth-token-url")
                .long("oauth-token-url")
                .help("IdP token endpoint")
                .env("VOUCH_OAUTH_TOKEN_URL")
                .required(true),
        )
        .arg(
            Arg::new("oauth-user-info-url")
                .long("oauth-user-info-url")
                .help("IdP userinfo endpoint (required for github, optional for OIDC)")
                .env("VOUCH_OAUTH_USER_INFO_URL"),
        )
        .arg(
            Arg::new("oauth-scopes")
                .long("oauth-scopes")
                .help("OAuth2 scopes to request")
                .env("VOUCH_OAUTH_SCOPES")
                .value_delimiter(',')
                .default_value("openid,email,profile"),
        )
        .arg(
            Arg::new("oauth-callback-url")
                .long("oauth-callback-url")
                .help("Public URL of the /auth callback endpoint")
                .env("VOUCH_OAUTH_CALLBACK_URL")
                .required(true),
        )
        .arg(
            Arg::new("oauth-code-challenge-method")
                .long("oauth-code-challenge-method")
                .help("Enable PKCE with the given challenge method")
                .env("VOUCH_OAUTH_CODE_CHALLENGE_METHOD")
                .value_parser(PossibleValuesParser::new(["S256"])),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(argv: &[&str]) -> clap::ArgMatches {
        with_args(Command::new("vouch")).get_matches_from(argv)
    }

    #[test]
    fn scopes_split_on_commas() {
        let matches = matches(&[
            "vouch",
            "--oauth-client-id",
            "c",
            "--oauth-auth-url",
            "https://idp/a",
            "--oauth-token-url",
            "https://idp/t",
            "--oauth-callback-url",
            "https://vouch/auth",
            "--oauth-scopes",
            "openid,email",
        ]);
        let scopes: Vec<&String> = matches
            .get_many::<String>("oauth-scopes")
            .expect("scopes")
            .collect();
        assert_eq!(scopes, ["openid", "email"]);
    }

    #[test]
    fn provider_rejects_unknown_values() {
        let result = with_args(Command::new("vouch")).try_get_matches_from(vec![
            "vouch",
            "--oauth-provider",
            "okta",
            "--oauth-client-id",
            "c",
            "--oauth-auth-url",
            "a",
            "--oauth-token-url",
            "t",
            "--oauth-callback-url",
            "u",
        ]);
        assert!(result.is_err());
    }
}
