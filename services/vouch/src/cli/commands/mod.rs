pub mod cookie;
pub mod jwt;
pub mod logging;
pub mod oauth;
pub mod policy;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("vouch")
        .about("SSO authentication proxy for nginx auth_request / Traefik forwardAuth")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("listen")
                .short('l')
                .long("listen")
                .help("Address to listen on")
                .default_value("0.0.0.0")
                .env("VOUCH_LISTEN"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("9090")
                .env("VOUCH_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = logging::with_args(command);
    let command = oauth::with_args(command);
    let command = jwt::with_args(command);
    let command = cookie::with_args(command);
    policy::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_ARGS: [&str; 9] = [
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
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "vouch");
        assert_eq!(
            command.get_about().expect("about").to_string(),
            "SSO authentication proxy for nginx auth_request / Traefik forwardAuth"
        );
        assert_eq!(
            command.get_version().expect("version").to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn minimal_invocation_parses() {
        let matches = new().get_matches_from(MINIMAL_ARGS);
        assert_eq!(matches.get_one::<u16>("port").copied(), Some(9090));
        assert_eq!(
            matches.get_one::<String>("listen").map(String::as_str),
            Some("0.0.0.0")
        );
    }

    #[test]
    fn oauth_client_id_is_required() {
        let result = new().try_get_matches_from(vec![
            "vouch",
            "--oauth-auth-url",
            "a",
            "--oauth-token-url",
            "t",
            "--oauth-callback-url",
            "u",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("VOUCH_PORT", Some("443")),
                ("VOUCH_LISTEN", Some("127.0.0.1")),
            ],
            || {
                let matches = new().get_matches_from(MINIMAL_ARGS);
                assert_eq!(matches.get_one::<u16>("port").copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>("listen").map(String::as_str),
                    Some("127.0.0.1")
                );
            },
        );
    }
}
