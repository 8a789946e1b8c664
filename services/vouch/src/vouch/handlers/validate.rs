use crate::vouch::{Services, cookie, handlers::request_host};
use axum::{
    extract::Extension,
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{SET_COOKIE, WWW_AUTHENTICATE},
    },
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::Value;
use session_token::{Error as TokenError, SessionClaims};
use std::sync::Arc;
use tracing::{debug, error, instrument};

pub const USER_HEADER: &str = "x-vouch-user";
pub const ACCESS_TOKEN_HEADER: &str = "x-vouch-idp-accesstoken";
pub const ID_TOKEN_HEADER: &str = "x-vouch-idp-idtoken";
pub const ERR_HEADER: &str = "x-vouch-err";

#[utoipa::path(
    get,
    path = "/validate",
    responses(
        (status = 200, description = "Request is authenticated; identity headers set"),
        (status = 401, description = "No valid session cookie"),
    ),
    tag = "auth",
)]
#[instrument(skip(services, headers))]
/// Answer the reverse proxy's `auth_request` subrequest.
///
/// The outcome depends only on the cookie and the signing key: a valid
/// token yields 200 plus the configured identity headers (with a sliding
/// cookie refresh near expiry), anything else yields 401. Cookies that fail
/// verification for a reason other than expiry are cleared.
pub async fn validate(
    Extension(services): Extension<Arc<Services>>,
    headers: HeaderMap,
) -> Response {
    let config = &services.config;

    let Some(token) = cookie::read_token(&headers, &config.cookie.name) else {
        return unauthorized("missing session cookie", Vec::new());
    };

    let now = Utc::now().timestamp();
    let claims = match services.signer.verify(&token, &config.jwt.issuer, now) {
        Ok(claims) => claims,
        Err(TokenError::Expired) => {
            debug!("session token expired");
            return unauthorized("token expired", Vec::new());
        }
        Err(err) => {
            debug!("session token rejected: {err}");
            let domain = cookie::cookie_domain(config, &request_host(&headers));
            let clear = cookie::clear_cookie_headers(config, domain.as_deref(), &headers);
            return unauthorized(&err.to_string(), clear);
        }
    };

    let mut response_headers = identity_headers(&services, &claims);

    if claims.needs_refresh(now, config.refresh_window_seconds) {
        refresh_cookie(&services, &headers, &claims, now, &mut response_headers);
    }

    (StatusCode::OK, response_headers).into_response()
}

fn unauthorized(reason: &str, clear: Vec<HeaderValue>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    if let Ok(value) = HeaderValue::from_str(reason) {
        headers.insert(HeaderName::from_static(ERR_HEADER), value);
    }
    for cookie in clear {
        headers.append(SET_COOKIE, cookie);
    }
    (StatusCode::UNAUTHORIZED, headers).into_response()
}

/// Render a claim value for a header: scalars verbatim, containers as JSON.
fn render_claim(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

fn identity_headers(services: &Services, claims: &SessionClaims) -> HeaderMap {
    let config = &services.config;
    let mut headers = HeaderMap::new();

    if config.headers.user
        && let Ok(value) = HeaderValue::from_str(&claims.username)
    {
        headers.insert(HeaderName::from_static(USER_HEADER), value);
    }

    for claim in &config.headers.claims {
        let Some(value) = claims.custom_claims.get(claim) else {
            continue;
        };
        let name = format!("{}{claim}", config.headers.claim_header);
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&render_claim(value)),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => debug!("claim {claim} cannot be rendered as a header"),
        }
    }

    if let Some(ptokens) = &claims.ptokens {
        if config.headers.access_token
            && !ptokens.access_token.is_empty()
            && let Ok(value) = HeaderValue::from_str(&ptokens.access_token)
        {
            headers.insert(HeaderName::from_static(ACCESS_TOKEN_HEADER), value);
        }
        if config.headers.id_token
            && !ptokens.id_token.is_empty()
            && let Ok(value) = HeaderValue::from_str(&ptokens.id_token)
        {
            headers.insert(HeaderName::from_static(ID_TOKEN_HEADER), value);
        }
    }

    headers
}

/// Sliding expiry: re-issue the cookie with a fresh `exp` in the same
/// response. Refresh failures are logged and swallowed; the request itself
/// is already authenticated.
fn refresh_cookie(
    services: &Services,
    request_headers: &HeaderMap,
    claims: &SessionClaims,
    now: i64,
    response_headers: &mut HeaderMap,
) {
    let config = &services.config;
    let mut refreshed = claims.clone();
    refreshed.iat = now;
    refreshed.exp = now + config.token_lifetime_seconds();

    let token = match services.signer.sign(&refreshed) {
        Ok(token) => token,
        Err(err) => {
            error!("failed to refresh session token: {err}");
            return;
        }
    };

    let domain = cookie::cookie_domain(config, &request_host(request_headers));
    match cookie::set_cookie_headers(config, domain.as_deref(), &token) {
        Ok(cookies) => {
            debug!("refreshing session cookie for {}", claims.username);
            for value in cookies {
                response_headers.append(SET_COOKIE, value);
            }
        }
        Err(err) => error!("failed to build refreshed cookie: {err}"),
    }
}
