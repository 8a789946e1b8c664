//! HTTP endpoint handlers composing the authentication state machine.

pub mod callback;
pub mod health;
pub mod login;
pub mod logout;
pub mod validate;

pub use self::callback::callback;
pub use self::health::healthcheck;
pub use self::login::login;
pub use self::logout::logout;
pub use self::validate::validate;

use axum::{
    Json,
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header::ACCEPT, header::HOST, header::LOCATION},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

/// Request host, used to scope the session cookie.
pub(super) fn request_host(headers: &HeaderMap) -> String {
    headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// 302 Found with optional `Set-Cookie` values.
pub(super) fn redirect_found(location: &str, cookies: &[HeaderValue]) -> Response {
    let mut response = Response::builder().status(StatusCode::FOUND);
    if let Ok(location) = HeaderValue::from_str(location) {
        response = response.header(LOCATION, location);
    }
    for cookie in cookies {
        response = response.header(axum::http::header::SET_COOKIE, cookie.clone());
    }
    response.body(Body::empty()).unwrap_or_else(|_| {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Standardized error body, JSON or HTML per the request's `Accept` header.
pub(super) fn error_response(headers: &HeaderMap, status: StatusCode, message: &str) -> Response {
    if wants_json(headers) {
        (status, Json(json!({ "error": message }))).into_response()
    } else {
        let body = format!(
            "<!DOCTYPE html><html><head><title>{code}</title></head>\
             <body><h1>{code}</h1><p>{message}</p></body></html>",
            code = status.as_u16(),
        );
        (status, Html(body)).into_response()
    }
}
