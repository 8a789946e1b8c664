//! IdP adapter capability: given an authorization code, return the
//! authenticated user, custom claims, and pass-through tokens.
//!
//! Variants are selected by provider name at startup and own their
//! response-shape mapping; the endpoint handlers only consume
//! [`Provider::get_user_info`].

use crate::vouch::config::Config;
use crate::vouch::types::{CustomClaims, User};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use reqwest::header::ACCEPT;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Map, Value};
use session_token::PTokens;
use std::str::FromStr;
use thiserror::Error;

pub mod adfs;
pub mod github;
pub mod google;
pub mod oidc;

#[derive(Debug, Error)]
pub enum IdpError {
    #[error("network error talking to the identity provider")]
    Network(#[from] reqwest::Error),
    #[error("identity provider returned an error: {code}: {description}")]
    IdpReturned { code: String, description: String },
    #[error("identity provider returned HTTP {0}")]
    HttpStatus(u16),
    #[error("malformed identity provider response: {0}")]
    MalformedResponse(&'static str),
    #[error("identity provider response carries no usable username")]
    MissingUsername,
}

/// Registry of supported identity providers, keyed by name at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Oidc,
    Adfs,
    Github,
    Google,
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "oidc" | "openid" => Ok(Self::Oidc),
            "adfs" => Ok(Self::Adfs),
            "github" => Ok(Self::Github),
            "google" => Ok(Self::Google),
            other => Err(format!("unknown oauth provider: {other}")),
        }
    }
}

impl Provider {
    /// Exchange the authorization `code` and map the provider's response
    /// onto the common identity types.
    ///
    /// # Errors
    ///
    /// See [`IdpError`]; `MissingUsername` is always fatal for the flow.
    pub async fn get_user_info(
        self,
        http: &reqwest::Client,
        config: &Config,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<(User, CustomClaims, PTokens), IdpError> {
        match self {
            Self::Oidc => oidc::get_user_info(http, config, code, code_verifier).await,
            Self::Adfs => adfs::get_user_info(http, config, code, code_verifier).await,
            Self::Github => github::get_user_info(http, config, code, code_verifier).await,
            Self::Google => google::get_user_info(http, config, code, code_verifier).await,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub id_token: String,
}

/// Form-encoded authorization-code exchange at the provider's token
/// endpoint. `extra` carries provider-specific parameters (e.g. ADFS
/// `resource`).
pub(crate) async fn exchange_code(
    http: &reqwest::Client,
    config: &Config,
    code: &str,
    code_verifier: Option<&str>,
    extra: &[(&str, &str)],
) -> Result<TokenResponse, IdpError> {
    let oauth = &config.oauth;
    let mut form: Vec<(&str, String)> = vec![
        ("grant_type", "authorization_code".to_string()),
        ("code", code.to_string()),
        ("redirect_uri", oauth.callback_url.clone()),
        ("client_id", oauth.client_id.clone()),
    ];
    if let Some(secret) = &oauth.client_secret {
        form.push(("client_secret", secret.expose_secret().to_string()));
    }
    if let Some(verifier) = code_verifier {
        form.push(("code_verifier", verifier.to_string()));
    }
    for (key, value) in extra {
        form.push((key, (*value).to_string()));
    }

    let response = http
        .post(&oauth.token_url)
        .header(ACCEPT, "application/json")
        .form(&form)
        .send()
        .await?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|_| IdpError::MalformedResponse("token endpoint did not return JSON"))?;

    // OAuth error bodies can arrive with either a 200 or an error status.
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        let description = body
            .get("error_description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(IdpError::IdpReturned {
            code: error.to_string(),
            description: description.to_string(),
        });
    }
    if !status.is_success() {
        return Err(IdpError::HttpStatus(status.as_u16()));
    }

    serde_json::from_value(body)
        .map_err(|_| IdpError::MalformedResponse("unexpected token endpoint response shape"))
}

/// Decode the payload segment of a JWT without verifying its signature. The
/// token arrived over the provider's TLS channel; its claims are trusted at
/// this point of the flow.
pub(crate) fn jwt_payload(token: &str) -> Result<Map<String, Value>, IdpError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or(IdpError::MalformedResponse("id_token is not a JWT"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| IdpError::MalformedResponse("id_token payload is not base64url"))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| IdpError::MalformedResponse("id_token payload is not a JSON object"))
}

pub(crate) fn str_claim(claims: &Map<String, Value>, key: &str) -> Option<String> {
    claims
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// GET a userinfo-style endpoint with the bearer access token.
pub(crate) async fn fetch_userinfo(
    http: &reqwest::Client,
    url: &str,
    access_token: &str,
) -> Result<Map<String, Value>, IdpError> {
    let response = http.get(url).bearer_auth(access_token).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(IdpError::HttpStatus(status.as_u16()));
    }
    response
        .json()
        .await
        .map_err(|_| IdpError::MalformedResponse("userinfo response is not a JSON object"))
}
