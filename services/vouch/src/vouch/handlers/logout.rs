use crate::vouch::{Services, cookie, handlers::{redirect_found, request_host}};
use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::{Html, IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

#[utoipa::path(
    get,
    path = "/logout",
    params(
        ("url" = Option<String>, Query, description = "Post-logout redirect target; must match a configured URI"),
    ),
    responses(
        (status = 200, description = "Session cookie cleared"),
        (status = 302, description = "Session cookie cleared; redirect to the configured target"),
    ),
    tag = "auth",
)]
#[instrument(skip(services, headers, query))]
/// Clear every session cookie chunk. Idempotent and infallible: logging out
/// twice, or without a session, still succeeds.
pub async fn logout(
    Extension(services): Extension<Arc<Services>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let config = &services.config;
    let domain = cookie::cookie_domain(config, &request_host(&headers));
    let cookies = cookie::clear_cookie_headers(config, domain.as_deref(), &headers);

    if let Some(target) = query.get("url") {
        if redirect_allowed(target, &config.post_logout_redirect_uris) {
            return redirect_found(target, &cookies);
        }
        debug!("post-logout redirect target {target} is not configured, ignoring");
    }

    let mut response =
        Html("<!DOCTYPE html><html><body><h1>Logged out</h1></body></html>").into_response();
    for value in cookies {
        response
            .headers_mut()
            .append(axum::http::header::SET_COOKIE, value);
    }
    response
}

/// Exact or prefix match against the configured post-logout URIs.
fn redirect_allowed(target: &str, configured: &[String]) -> bool {
    configured
        .iter()
        .any(|uri| target == uri || target.starts_with(uri.as_str()))
}
