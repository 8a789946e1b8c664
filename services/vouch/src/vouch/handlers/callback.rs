use crate::vouch::{
    Services, authz,
    authz::Decision,
    cookie,
    handlers::{error_response, redirect_found, request_host},
    idp::IdpError,
    types::{CustomClaims, User},
};
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use session_token::{PTokens, SessionClaims};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};
use utoipa::IntoParams;

#[derive(IntoParams, Debug, Deserialize, Default)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// Authorization code from the IdP
    #[serde(default)]
    pub code: Option<String>,
    /// State nonce issued by `/login`
    #[serde(default)]
    pub state: Option<String>,
    /// Error code from the IdP, if the user denied or the IdP failed
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Login complete; session cookie set"),
        (status = 400, description = "Unknown or replayed state, or IdP exchange failed"),
        (status = 401, description = "IdP returned an error"),
        (status = 403, description = "Authenticated identity is not authorized"),
    ),
    tag = "auth",
)]
#[instrument(skip(services, headers, query))]
/// IdP callback: redeem the state nonce, exchange the code, authorize the
/// identity, mint the session token, and send the browser back to the
/// originally requested URL.
///
/// The sequence is strict; any failing step aborts the flow with no cookie
/// issued.
pub async fn callback(
    Extension(services): Extension<Arc<Services>>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let config = &services.config;

    if let Some(idp_error) = &query.error {
        let description = query.error_description.as_deref().unwrap_or_default();
        warn!("IdP returned an error: {idp_error}: {description}");
        return error_response(
            &headers,
            StatusCode::UNAUTHORIZED,
            &format!("identity provider error: {idp_error}: {description}"),
        );
    }

    let Some(state) = query.state.as_deref().filter(|state| !state.is_empty()) else {
        return error_response(&headers, StatusCode::BAD_REQUEST, "missing state parameter");
    };

    // Single-use: a replayed state fails here.
    let Some(login_state) = services.nonces.take(state).await else {
        debug!("state nonce unknown, replayed, or expired");
        return error_response(
            &headers,
            StatusCode::BAD_REQUEST,
            "state mismatch or expired, restart the login flow",
        );
    };

    let Some(code) = query.code.as_deref().filter(|code| !code.is_empty()) else {
        return error_response(&headers, StatusCode::BAD_REQUEST, "missing code parameter");
    };

    let (user, custom_claims, ptokens) = match services
        .provider
        .get_user_info(
            &services.http,
            config,
            code,
            login_state.code_verifier.as_deref(),
        )
        .await
    {
        Ok(identity) => identity,
        Err(err) => {
            error!("failed to retrieve user info from the IdP: {err}");
            return error_response(&headers, idp_error_status(&err), &err.to_string());
        }
    };

    match authz::verify_user(&user, config) {
        Decision::Allowed => {}
        Decision::Denied(reason) => {
            warn!("user is not authorized: {reason}");
            return error_response(
                &headers,
                StatusCode::FORBIDDEN,
                &format!("not authorized: {reason}"),
            );
        }
    }

    let token = match services
        .signer
        .sign(&session_claims(config, &user, &custom_claims, ptokens))
    {
        Ok(token) => token,
        Err(err) => {
            error!("session token creation failed: {err}");
            return error_response(
                &headers,
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            );
        }
    };

    let domain = cookie::cookie_domain(config, &request_host(&headers));
    let cookies = match cookie::set_cookie_headers(config, domain.as_deref(), &token) {
        Ok(cookies) => cookies,
        Err(err) => {
            error!("session cookie creation failed: {err}");
            return error_response(
                &headers,
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            );
        }
    };

    debug!("login complete for {}", user.username);

    if login_state.requested_url.is_empty() {
        let mut response =
            Html("<!DOCTYPE html><html><body><h1>Logged in</h1></body></html>").into_response();
        for value in cookies {
            response
                .headers_mut()
                .append(axum::http::header::SET_COOKIE, value);
        }
        return response;
    }

    redirect_found(&login_state.requested_url, &cookies)
}

fn idp_error_status(err: &IdpError) -> StatusCode {
    match err {
        IdpError::IdpReturned { .. } => StatusCode::UNAUTHORIZED,
        IdpError::Network(_)
        | IdpError::HttpStatus(_)
        | IdpError::MalformedResponse(_)
        | IdpError::MissingUsername => StatusCode::BAD_REQUEST,
    }
}

/// Assemble the token payload. Only claims the operator asked to surface as
/// headers are carried; pass-through tokens are embedded when any of the
/// token headers is enabled.
fn session_claims(
    config: &crate::vouch::config::Config,
    user: &User,
    custom_claims: &CustomClaims,
    ptokens: PTokens,
) -> SessionClaims {
    let now = Utc::now().timestamp();
    let carried: CustomClaims = config
        .headers
        .claims
        .iter()
        .filter_map(|claim| {
            custom_claims
                .get(claim)
                .map(|value| (claim.clone(), value.clone()))
        })
        .collect();

    let embed_ptokens = config.headers.access_token || config.headers.id_token;
    SessionClaims {
        username: user.username.clone(),
        custom_claims: carried,
        ptokens: if embed_ptokens && !ptokens.is_empty() {
            Some(ptokens)
        } else {
            None
        },
        iss: config.jwt.issuer.clone(),
        iat: now,
        exp: now + config.token_lifetime_seconds(),
    }
}
