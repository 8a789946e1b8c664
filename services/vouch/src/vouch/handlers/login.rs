use crate::vouch::{Services, domains, handlers::{error_response, redirect_found}, nonce};
use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use url::Url;

#[utoipa::path(
    get,
    path = "/login",
    params(
        ("url" = String, Query, description = "Originally requested URL to return to after login"),
    ),
    responses(
        (status = 302, description = "Redirect to the IdP authorize URL"),
        (status = 400, description = "Missing or unmanaged redirect target"),
    ),
    tag = "auth",
)]
#[instrument(skip(services, headers, query))]
/// Start the login flow: stash the pre-auth context under a fresh `state`
/// nonce and send the browser to the IdP.
pub async fn login(
    Extension(services): Extension<Arc<Services>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let config = &services.config;

    let requested_url = match query.get(&config.redirect_url_param) {
        Some(url) if !url.is_empty() => url.clone(),
        _ => {
            return error_response(
                &headers,
                StatusCode::BAD_REQUEST,
                &format!("missing {} query parameter", config.redirect_url_param),
            );
        }
    };

    if !config.testing && !redirect_target_allowed(&requested_url, &config.domains) {
        debug!("rejected login redirect target {requested_url}");
        return error_response(
            &headers,
            StatusCode::BAD_REQUEST,
            "requested URL is not within a managed domain",
        );
    }

    let state = match nonce::generate_state() {
        Ok(state) => state,
        Err(err) => {
            error!("failed to generate state nonce: {err:#}");
            return error_response(
                &headers,
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error",
            );
        }
    };

    let (code_verifier, code_challenge) = if config.oauth.code_challenge_method.is_some() {
        match nonce::generate_code_verifier() {
            Ok(verifier) => {
                let challenge = nonce::code_challenge(&verifier);
                (Some(verifier), Some(challenge))
            }
            Err(err) => {
                error!("failed to generate PKCE verifier: {err:#}");
                return error_response(
                    &headers,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error",
                );
            }
        }
    } else {
        (None, None)
    };

    let authorize_url = match build_authorize_url(services.as_ref(), &state, code_challenge.as_deref())
    {
        Ok(url) => url,
        Err(message) => {
            error!("cannot build IdP authorize URL: {message}");
            return error_response(&headers, StatusCode::INTERNAL_SERVER_ERROR, "internal error");
        }
    };

    services
        .nonces
        .put(
            state,
            nonce::LoginState {
                requested_url,
                code_verifier,
                code_challenge,
            },
        )
        .await;

    redirect_found(&authorize_url, &[])
}

/// With managed domains configured the target must lie inside one; without
/// any (allow-all setups) any http(s) URL is accepted.
fn redirect_target_allowed(target: &str, managed: &[String]) -> bool {
    if managed.is_empty() {
        return Url::parse(target)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
    }
    domains::is_managed_url(target, managed)
}

fn build_authorize_url(
    services: &Services,
    state: &str,
    code_challenge: Option<&str>,
) -> Result<String, String> {
    let oauth = &services.config.oauth;
    let mut url =
        Url::parse(&oauth.auth_url).map_err(|err| format!("bad auth_url: {err}"))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("response_type", "code")
            .append_pair("client_id", &oauth.client_id)
            .append_pair("redirect_uri", &oauth.callback_url)
            .append_pair("scope", &oauth.scopes.join(" "))
            .append_pair("state", state);
        if let (Some(challenge), Some(method)) =
            (code_challenge, oauth.code_challenge_method.as_deref())
        {
            pairs
                .append_pair("code_challenge", challenge)
                .append_pair("code_challenge_method", method);
        }
    }
    Ok(url.into())
}
