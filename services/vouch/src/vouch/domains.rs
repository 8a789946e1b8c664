//! Managed-domain checks: cookie parent-domain scoping and redirect-target
//! validation.

use url::Url;

/// Label-suffix equality: `host` equals `domain` or is a sub-domain of it.
/// Comparison is case-insensitive; a leading dot on the configured domain is
/// tolerated.
fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    let domain = domain.trim_start_matches('.');
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// True when the email's domain part equals, or is a sub-domain of, one of
/// the managed domains.
#[must_use]
pub fn is_under_management(email: &str, domains: &[String]) -> bool {
    let Some((local, host)) = email.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || host.is_empty() {
        return false;
    }
    domains.iter().any(|domain| domain_matches(host, domain))
}

/// The longest configured managed domain that is a suffix of `host`, used to
/// scope the session cookie so it is shared by all protected applications.
#[must_use]
pub fn parent_domain<'domains>(host: &str, domains: &'domains [String]) -> Option<&'domains str> {
    let host = host.split(':').next().unwrap_or(host);
    domains
        .iter()
        .filter(|domain| domain_matches(host, domain))
        .max_by_key(|domain| domain.len())
        .map(String::as_str)
}

/// True when `target` is an http(s) URL whose host lies within a managed
/// domain. Used by `/login` to refuse open redirects.
#[must_use]
pub fn is_managed_url(target: &str, domains: &[String]) -> bool {
    let Ok(url) = Url::parse(target) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    domains.iter().any(|domain| domain_matches(host, domain))
}
