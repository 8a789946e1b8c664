use crate::vouch::{
    self, Services,
    config::{Config, SigningMethod},
};
use anyhow::{Context, Result, anyhow, bail};
use rand::{RngCore, rngs::OsRng};
use secrecy::{ExposeSecret, SecretString};
use session_token::Signer;
use std::fs;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub config: Config,
    pub jwt_secret: Option<SecretString>,
    pub jwt_private_key: Option<String>,
    pub jwt_public_key: Option<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if key material cannot be loaded, the configuration is
/// invalid, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let signer = build_signer(&args)?;
    log_startup_args(&args.config);

    let services = Services::new(args.config, signer)?;
    vouch::new(services).await
}

fn build_signer(args: &Args) -> Result<Signer> {
    match args.config.jwt.signing_method {
        SigningMethod::Hs256 => {
            let secret = match &args.jwt_secret {
                Some(secret) => secret.expose_secret().as_bytes().to_vec(),
                None => {
                    warn!(
                        "no jwt secret configured, generating a random one; \
                         sessions will not survive a restart and cannot be \
                         shared across instances"
                    );
                    let mut bytes = [0u8; 32];
                    OsRng
                        .try_fill_bytes(&mut bytes)
                        .context("failed to generate a jwt secret")?;
                    bytes.to_vec()
                }
            };
            Signer::hs256(&secret).map_err(|err| anyhow!("invalid HS256 secret: {err}"))
        }
        SigningMethod::Rs256 => {
            if let Some(path) = &args.jwt_private_key {
                let key = fs::read(path)
                    .with_context(|| format!("failed to read private key at {path}"))?;
                Signer::rs256(&key).map_err(|err| anyhow!("invalid RS256 private key: {err}"))
            } else if let Some(path) = &args.jwt_public_key {
                warn!("only a public key is configured, tokens can be verified but not minted");
                let key = fs::read(path)
                    .with_context(|| format!("failed to read public key at {path}"))?;
                Signer::rs256_verify_only(&key)
                    .map_err(|err| anyhow!("invalid RS256 public key: {err}"))
            } else {
                bail!("RS256 requires --jwt-private-key (or --jwt-public-key for verify-only)")
            }
        }
    }
}

fn log_startup_args(config: &Config) {
    let entries = [
        ("listen", format!("{}:{}", config.listen, config.port)),
        ("oauth.provider", config.oauth.provider.clone()),
        ("oauth.callback_url", config.oauth.callback_url.clone()),
        (
            "jwt.signing_method",
            format!("{:?}", config.jwt.signing_method),
        ),
        ("policy", format!("{:?}", config.policy_mode())),
        ("domains", config.domains.join(",")),
        ("cookie.name", config.cookie.name.clone()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = String::from("Startup configuration:");
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}
