use clap::{Arg, Command, builder::PossibleValuesParser};

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("jwt-issuer")
                .long("jwt-issuer")
                .help("Issuer claim stamped into and required from session tokens")
                .env("VOUCH_JWT_ISSUER")
                .default_value("Vouch"),
        )
        .arg(
            Arg::new("jwt-max-age")
                .long("jwt-max-age")
                .help("Session token lifetime in minutes")
                .env("VOUCH_JWT_MAX_AGE")
                .default_value("240")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
        .arg(
            Arg::new("jwt-signing-method")
                .long("jwt-signing-method")
                .help("Token signature algorithm")
                .env("VOUCH_JWT_SIGNING_METHOD")
                .default_value("HS256")
                .value_parser(PossibleValuesParser::new(["HS256", "RS256"])),
        )
        .arg(
            Arg::new("jwt-secret")
                .long("jwt-secret")
                .help("HS256 shared secret; generated (sessions won't survive restarts) when omitted")
                .env("VOUCH_JWT_SECRET"),
        )
        .arg(
            Arg::new("jwt-private-key")
                .long("jwt-private-key")
                .help("Path to the RS256 RSA private key (PKCS#8 or PKCS#1, PEM or DER)")
                .env("VOUCH_JWT_PRIVATE_KEY"),
        )
        .arg(
            Arg::new("jwt-public-key")
                .long("jwt-public-key")
                .help("Path to the RS256 RSA public key (only needed without the private key)")
                .env("VOUCH_JWT_PUBLIC_KEY"),
        )
}
