use clap::{Arg, ArgAction, Command, builder::PossibleValuesParser};

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("cookie-name")
                .long("cookie-name")
                .help("Base name of the session cookie")
                .env("VOUCH_COOKIE_NAME")
                .default_value("VouchCookie"),
        )
        .arg(
            Arg::new("cookie-domain")
                .long("cookie-domain")
                .help("Explicit cookie Domain; computed from the managed domains when omitted")
                .env("VOUCH_COOKIE_DOMAIN"),
        )
        .arg(
            Arg::new("cookie-secure")
                .long("cookie-secure")
                .help("Set the Secure flag (serve vouch and apps over HTTPS)")
                .env("VOUCH_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cookie-http-only")
                .long("cookie-http-only")
                .help("Set the HttpOnly flag")
                .env("VOUCH_COOKIE_HTTP_ONLY")
                .default_value("true")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new("cookie-same-site")
                .long("cookie-same-site")
                .help("SameSite attribute")
                .env("VOUCH_COOKIE_SAME_SITE")
                .default_value("lax")
                .value_parser(PossibleValuesParser::new(["lax", "strict", "none"])),
        )
        .arg(
            Arg::new("cookie-max-age")
                .long("cookie-max-age")
                .help("Cookie lifetime in seconds; defaults to the token lifetime")
                .env("VOUCH_COOKIE_MAX_AGE")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_defaults() {
        let matches = with_args(Command::new("vouch")).get_matches_from(vec!["vouch"]);
        assert_eq!(
            matches.get_one::<String>("cookie-name").map(String::as_str),
            Some("VouchCookie")
        );
        assert!(!matches.get_flag("cookie-secure"));
        assert_eq!(matches.get_one::<bool>("cookie-http-only"), Some(&true));
        assert_eq!(matches.get_one::<i64>("cookie-max-age"), None);
    }
}
