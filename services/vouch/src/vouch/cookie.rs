//! Session cookie codec: write, read, and clear the cookie carrying the
//! signed session token, splitting oversized tokens into numbered chunks.
//!
//! All chunks of one logical cookie carry identical attributes so browsers
//! treat them as a unit.

use crate::vouch::config::{Config, CookieConfig};
use crate::vouch::domains;
use axum::http::{HeaderMap, HeaderValue, header::COOKIE, header::InvalidHeaderValue};
use std::collections::HashMap;

/// Cookie `Domain` for a request `Host`: the explicit configured domain when
/// set, otherwise the longest managed-domain suffix of the host.
#[must_use]
pub fn cookie_domain(config: &Config, host: &str) -> Option<String> {
    if let Some(domain) = &config.cookie.domain {
        return Some(domain.clone());
    }
    domains::parent_domain(host, &config.domains).map(ToString::to_string)
}

fn attributes(cookie: &CookieConfig, domain: Option<&str>, max_age: i64) -> String {
    let mut attrs = String::from("; Path=/");
    if cookie.http_only {
        attrs.push_str("; HttpOnly");
    }
    attrs.push_str(&format!("; SameSite={}", cookie.same_site.as_str()));
    attrs.push_str(&format!("; Max-Age={max_age}"));
    if let Some(domain) = domain {
        attrs.push_str(&format!("; Domain={domain}"));
    }
    if cookie.secure {
        attrs.push_str("; Secure");
    }
    attrs
}

fn chunk_name(base: &str, index: usize) -> String {
    if index == 0 {
        base.to_string()
    } else {
        format!("{base}_{index}")
    }
}

/// Build the `Set-Cookie` values carrying `token`, chunked when it exceeds
/// the configured threshold.
///
/// # Errors
///
/// Returns an error when a cookie string is not a valid header value.
pub fn set_cookie_headers(
    config: &Config,
    domain: Option<&str>,
    token: &str,
) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    let cookie = &config.cookie;
    let attrs = attributes(cookie, domain, cookie.max_age_seconds);

    let bytes = token.as_bytes();
    let chunks: Vec<&[u8]> = if bytes.len() <= cookie.chunk_size {
        vec![bytes]
    } else {
        bytes.chunks(cookie.chunk_size).collect()
    };

    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            // Token text is base64url plus dots, always valid UTF-8.
            let value = String::from_utf8_lossy(chunk);
            HeaderValue::from_str(&format!(
                "{}={value}{attrs}",
                chunk_name(&cookie.name, index)
            ))
        })
        .collect()
}

/// Build `Set-Cookie` values that delete the base cookie and every chunk
/// observed on the request. Idempotent: clearing an absent cookie still
/// produces a deletion for the base name.
#[must_use]
pub fn clear_cookie_headers(
    config: &Config,
    domain: Option<&str>,
    request_headers: &HeaderMap,
) -> Vec<HeaderValue> {
    let cookie = &config.cookie;
    let attrs = attributes(cookie, domain, 0);
    let pairs = cookie_pairs(request_headers);

    let mut names = vec![cookie.name.clone()];
    let mut index = 1;
    while pairs.contains_key(&chunk_name(&cookie.name, index)) {
        names.push(chunk_name(&cookie.name, index));
        index += 1;
    }

    names
        .iter()
        .filter_map(|name| HeaderValue::from_str(&format!("{name}={attrs}")).ok())
        .collect()
}

fn cookie_pairs(headers: &HeaderMap) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let trimmed = pair.trim();
            let mut parts = trimmed.splitn(2, '=');
            let Some(key) = parts.next() else { continue };
            let Some(val) = parts.next() else { continue };
            pairs.insert(key.trim().to_string(), val.trim().to_string());
        }
    }
    pairs
}

/// Read the session token from the request, reassembling numbered chunks in
/// order. Returns `None` when the base cookie is absent.
#[must_use]
pub fn read_token(headers: &HeaderMap, name: &str) -> Option<String> {
    let pairs = cookie_pairs(headers);
    let mut token = pairs.get(name)?.clone();

    let mut index = 1;
    while let Some(chunk) = pairs.get(&chunk_name(name, index)) {
        token.push_str(chunk);
        index += 1;
    }
    Some(token)
}
