use clap::{Arg, ArgAction, Command};

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("domains")
                .long("domains")
                .help("Managed domains: cookie scope and the default authorization policy")
                .env("VOUCH_DOMAINS")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("whitelist")
                .long("whitelist")
                .help("Usernames allowed through (takes priority over team and domain policies)")
                .env("VOUCH_WHITELIST")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("team-whitelist")
                .long("team-whitelist")
                .help("Team memberships allowed through")
                .env("VOUCH_TEAM_WHITELIST")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("allow-all-users")
                .long("allow-all-users")
                .help("Authorize every successfully authenticated identity")
                .env("VOUCH_ALLOW_ALL_USERS")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("case-insensitive-emails")
                .long("case-insensitive-emails")
                .help("Compare email-shaped usernames against the whitelist case-insensitively")
                .env("VOUCH_CASE_INSENSITIVE_EMAILS")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("case-insensitive-email-domains")
                .long("case-insensitive-email-domains")
                .help("Email domains whose users are whitelist-matched case-insensitively")
                .env("VOUCH_CASE_INSENSITIVE_EMAIL_DOMAINS")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("post-logout-redirect-uris")
                .long("post-logout-redirect-uris")
                .help("URLs /logout may redirect to (exact or prefix match)")
                .env("VOUCH_POST_LOGOUT_REDIRECT_URIS")
                .value_delimiter(','),
        )
        .arg(
            Arg::new("testing")
                .long("testing")
                .help("Relax safety rails for local testing")
                .env("VOUCH_TESTING")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_arguments_split_on_commas() {
        let matches = with_args(Command::new("vouch")).get_matches_from(vec![
            "vouch",
            "--domains",
            "example.com,example.org",
            "--whitelist",
            "alice@example.com",
        ]);
        let domains: Vec<&String> = matches
            .get_many::<String>("domains")
            .expect("domains")
            .collect();
        assert_eq!(domains, ["example.com", "example.org"]);
        assert!(!matches.get_flag("allow-all-users"));
    }

    #[test]
    fn flags_read_from_env() {
        temp_env::with_vars([("VOUCH_ALLOW_ALL_USERS", Some("true"))], || {
            let matches = with_args(Command::new("vouch")).get_matches_from(vec!["vouch"]);
            assert!(matches.get_flag("allow-all-users"));
        });
    }
}
