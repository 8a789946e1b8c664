//! Immutable runtime configuration.
//!
//! Built once at startup from CLI/environment arguments and passed into the
//! composed [`crate::vouch::Services`] value; never mutated afterwards, safe
//! for concurrent reads.

use anyhow::{Result, bail};
use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use url::Url;

pub const DEFAULT_COOKIE_NAME: &str = "VouchCookie";
pub const DEFAULT_CLAIM_HEADER_PREFIX: &str = "X-Vouch-IdP-Claims-";
pub const DEFAULT_COOKIE_CHUNK_SIZE: usize = 4096;
pub const DEFAULT_JWT_MAX_AGE_MINUTES: i64 = 240;
pub const DEFAULT_REFRESH_WINDOW_SECONDS: i64 = 5 * 60;
pub const DEFAULT_NONCE_TTL_SECONDS: u64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            other => Err(format!("invalid SameSite value: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningMethod {
    #[default]
    Hs256,
    Rs256,
}

impl FromStr for SigningMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "RS256" => Ok(Self::Rs256),
            other => Err(format!("invalid signing method: {other}")),
        }
    }
}

/// Session cookie attributes. All chunks of an oversized token share these
/// attributes so browsers treat them as one logical cookie.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    /// Explicit cookie domain; when unset the parent domain is computed from
    /// the request host against the managed `domains`.
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    /// Lifetime of the cookie; defaults to the token lifetime.
    pub max_age_seconds: i64,
    /// Tokens longer than this are split into numbered chunks.
    pub chunk_size: usize,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            domain: None,
            secure: false,
            http_only: true,
            same_site: SameSite::default(),
            max_age_seconds: DEFAULT_JWT_MAX_AGE_MINUTES * 60,
            chunk_size: DEFAULT_COOKIE_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub max_age_minutes: i64,
    pub signing_method: SigningMethod,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "Vouch".to_string(),
            max_age_minutes: DEFAULT_JWT_MAX_AGE_MINUTES,
            signing_method: SigningMethod::default(),
        }
    }
}

/// Which identity headers `/validate` emits to the reverse proxy.
#[derive(Debug, Clone)]
pub struct HeadersConfig {
    pub user: bool,
    /// Claim names copied from the token into `<claim_header><Claim>`.
    pub claims: Vec<String>,
    pub claim_header: String,
    pub access_token: bool,
    pub id_token: bool,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            user: true,
            claims: Vec::new(),
            claim_header: DEFAULT_CLAIM_HEADER_PREFIX.to_string(),
            access_token: false,
            id_token: false,
        }
    }
}

#[derive(Clone)]
pub struct OauthConfig {
    pub provider: String,
    pub client_id: String,
    pub client_secret: Option<SecretString>,
    pub auth_url: String,
    pub token_url: String,
    pub user_info_url: Option<String>,
    pub scopes: Vec<String>,
    pub callback_url: String,
    /// `Some("S256")` enables PKCE.
    pub code_challenge_method: Option<String>,
}

impl fmt::Debug for OauthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OauthConfig")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret_set", &self.client_secret.is_some())
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("user_info_url", &self.user_info_url)
            .field("scopes", &self.scopes)
            .field("callback_url", &self.callback_url)
            .field("code_challenge_method", &self.code_challenge_method)
            .finish()
    }
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            provider: "oidc".to_string(),
            client_id: String::new(),
            client_secret: None,
            auth_url: String::new(),
            token_url: String::new(),
            user_info_url: None,
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
            callback_url: String::new(),
            code_challenge_method: None,
        }
    }
}

/// Which authorization rule is active, in evaluation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyMode {
    AllowAll,
    UserWhitelist,
    TeamWhitelist,
    ManagedDomains,
    /// Nothing configured; everyone with a successful IdP login is let in.
    OpenFallback,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub port: u16,
    pub domains: Vec<String>,
    pub whitelist: Vec<String>,
    pub team_whitelist: Vec<String>,
    pub allow_all_users: bool,
    pub case_insensitive_emails: bool,
    pub case_insensitive_email_domains: Vec<String>,
    pub cookie: CookieConfig,
    pub jwt: JwtConfig,
    pub headers: HeadersConfig,
    pub oauth: OauthConfig,
    pub post_logout_redirect_uris: Vec<String>,
    /// Query parameter carrying the originally requested URL on `/login`.
    pub redirect_url_param: String,
    /// Sliding refresh: `/validate` re-issues the cookie when the token has
    /// less than this many seconds left.
    pub refresh_window_seconds: i64,
    pub nonce_ttl_seconds: u64,
    pub testing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0".to_string(),
            port: 9090,
            domains: Vec::new(),
            whitelist: Vec::new(),
            team_whitelist: Vec::new(),
            allow_all_users: false,
            case_insensitive_emails: false,
            case_insensitive_email_domains: Vec::new(),
            cookie: CookieConfig::default(),
            jwt: JwtConfig::default(),
            headers: HeadersConfig::default(),
            oauth: OauthConfig::default(),
            post_logout_redirect_uris: Vec::new(),
            redirect_url_param: "url".to_string(),
            refresh_window_seconds: DEFAULT_REFRESH_WINDOW_SECONDS,
            nonce_ttl_seconds: DEFAULT_NONCE_TTL_SECONDS,
            testing: false,
        }
    }
}

impl Config {
    /// The active authorization policy, in priority order.
    #[must_use]
    pub fn policy_mode(&self) -> PolicyMode {
        if self.allow_all_users {
            PolicyMode::AllowAll
        } else if !self.whitelist.is_empty() {
            PolicyMode::UserWhitelist
        } else if !self.team_whitelist.is_empty() {
            PolicyMode::TeamWhitelist
        } else if !self.domains.is_empty() {
            PolicyMode::ManagedDomains
        } else {
            PolicyMode::OpenFallback
        }
    }

    #[must_use]
    pub fn token_lifetime_seconds(&self) -> i64 {
        self.jwt.max_age_minutes * 60
    }

    /// Validate cross-field consistency; fatal at startup only.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending field on the first violation.
    pub fn validate(&self) -> Result<()> {
        if self.oauth.client_id.is_empty() {
            bail!("oauth.client_id is required");
        }
        if self.oauth.auth_url.is_empty() {
            bail!("oauth.auth_url is required");
        }
        if self.oauth.token_url.is_empty() {
            bail!("oauth.token_url is required");
        }
        if Url::parse(&self.oauth.callback_url).is_err() {
            bail!("oauth.callback_url is not a valid URL");
        }
        if let Some(method) = &self.oauth.code_challenge_method
            && method != "S256"
        {
            bail!("oauth.code_challenge_method must be S256");
        }
        if self.jwt.max_age_minutes <= 0 {
            bail!("jwt.max_age must be positive");
        }
        if self.cookie.chunk_size == 0 {
            bail!("cookie chunk size must be positive");
        }
        if self.policy_mode() == PolicyMode::OpenFallback {
            warn!(
                "no domains, whitelist, teamWhitelist or allowAllUsers configured, \
                 any successful auth to the IdP authorizes access"
            );
        }
        Ok(())
    }
}
