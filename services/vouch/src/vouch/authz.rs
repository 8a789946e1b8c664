//! Authorization engine: decides whether an authenticated identity is
//! permitted, using the configured policy.

use crate::vouch::config::{Config, PolicyMode};
use crate::vouch::domains;
use crate::vouch::types::User;
use regex::Regex;
use tracing::debug;

// HTML5-style email pattern, shared with the ADFS UPN fallback so the two
// checks never diverge.
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

/// Checks if the email provided passes the required structure and length.
#[must_use]
pub fn is_email_valid(email: &str) -> bool {
    if email.len() < 3 || email.len() > 254 {
        return false;
    }
    Regex::new(EMAIL_PATTERN).is_ok_and(|regex| regex.is_match(email))
}

/// Outcome of the authorization decision. The denial reason names the policy
/// mode that was violated, never the full policy contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(String),
}

fn username_is_case_insensitive(user: &User, config: &Config) -> bool {
    if config.case_insensitive_emails {
        return true;
    }

    let lower_username = user.username.to_lowercase();
    config
        .case_insensitive_email_domains
        .iter()
        .any(|domain| lower_username.ends_with(&format!("@{}", domain.to_lowercase())))
}

fn check_whitelist(user: &User, config: &Config) -> Decision {
    // Case folding only applies to email-shaped usernames from domains the
    // operator marked case-insensitive.
    let fold = is_email_valid(&user.username) && username_is_case_insensitive(user, config);
    let lower_username = user.username.to_lowercase();

    for entry in &config.whitelist {
        if user.username == *entry || (fold && lower_username == entry.to_lowercase()) {
            debug!("authorize: found {} in whitelist", user.username);
            return Decision::Allowed;
        }
    }
    Decision::Denied(format!(
        "user {} is not in the whitelist",
        user.username
    ))
}

fn check_team_whitelist(user: &User, config: &Config) -> Decision {
    for team in &user.team_memberships {
        if config.team_whitelist.iter().any(|entry| entry == team) {
            debug!("authorize: found team {} for user {}", team, user.username);
            return Decision::Allowed;
        }
    }
    Decision::Denied(format!(
        "user {} has no membership in the team whitelist",
        user.username
    ))
}

fn check_domains(user: &User, config: &Config) -> Decision {
    if domains::is_under_management(&user.email, &config.domains) {
        debug!("authorize: email {} is within a managed domain", user.email);
        return Decision::Allowed;
    }
    Decision::Denied(format!(
        "email {} is not within a managed domain",
        user.email
    ))
}

/// Run the configured policy against a fully populated [`User`].
///
/// Rules are evaluated in priority order; the first configured mode decides.
#[must_use]
pub fn verify_user(user: &User, config: &Config) -> Decision {
    if user.username.is_empty() {
        return Decision::Denied("identity has an empty username".to_string());
    }

    match config.policy_mode() {
        PolicyMode::AllowAll => {
            debug!("authorize: allowAllUsers is set, skipping verification");
            Decision::Allowed
        }
        PolicyMode::UserWhitelist => check_whitelist(user, config),
        PolicyMode::TeamWhitelist => check_team_whitelist(user, config),
        PolicyMode::ManagedDomains => check_domains(user, config),
        // Nothing configured; the startup warning already flagged this.
        PolicyMode::OpenFallback => Decision::Allowed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    fn user(username: &str, email: &str) -> User {
        User::new(username, email)
    }

    #[test]
    fn email_regex_accepts_common_shapes() {
        assert!(is_email_valid("alice@example.com"));
        assert!(is_email_valid("name.surname+tag@sub.example.co"));
        assert!(is_email_valid("carol@corp.local"));
    }

    #[test]
    fn email_regex_rejects_invalid_shapes() {
        assert!(!is_email_valid("alice"));
        assert!(!is_email_valid("a@"));
        assert!(!is_email_valid("@example.com"));
        assert!(!is_email_valid("alice@-example.com"));
        assert!(!is_email_valid(""));
    }

    #[test]
    fn empty_username_is_always_denied() {
        let mut config = config();
        config.allow_all_users = true;
        assert!(matches!(
            verify_user(&user("", "a@example.com"), &config),
            Decision::Denied(_)
        ));
    }

    #[test]
    fn allow_all_users_wins_over_whitelist() {
        let mut config = config();
        config.allow_all_users = true;
        config.whitelist = vec!["bob@example.com".to_string()];
        assert_eq!(
            verify_user(&user("alice@example.com", "alice@example.com"), &config),
            Decision::Allowed
        );
    }

    #[test]
    fn whitelist_exact_match() {
        let mut config = config();
        config.whitelist = vec!["alice@example.com".to_string()];
        assert_eq!(
            verify_user(&user("alice@example.com", "alice@example.com"), &config),
            Decision::Allowed
        );
    }

    #[test]
    fn whitelist_miss_is_denied() {
        let mut config = config();
        config.whitelist = vec!["bob@example.com".to_string()];
        assert!(matches!(
            verify_user(&user("alice@example.com", "alice@example.com"), &config),
            Decision::Denied(reason) if reason.contains("whitelist")
        ));
    }

    #[test]
    fn whitelist_case_insensitive_domain_folds_both_sides() {
        let mut config = config();
        config.whitelist = vec!["Bob@Example.com".to_string()];
        config.case_insensitive_email_domains = vec!["example.com".to_string()];
        assert_eq!(
            verify_user(&user("bob@EXAMPLE.COM", "bob@example.com"), &config),
            Decision::Allowed
        );
    }

    #[test]
    fn whitelist_case_sensitive_without_config() {
        let mut config = config();
        config.whitelist = vec!["Bob@Example.com".to_string()];
        assert!(matches!(
            verify_user(&user("bob@example.com", "bob@example.com"), &config),
            Decision::Denied(_)
        ));
    }

    #[test]
    fn whitelist_case_folding_requires_email_shape() {
        // Non-email usernames stay case-sensitive even with the global flag.
        let mut config = config();
        config.whitelist = vec!["ALICE".to_string()];
        config.case_insensitive_emails = true;
        assert!(matches!(
            verify_user(&user("alice", "alice@example.com"), &config),
            Decision::Denied(_)
        ));
    }

    #[test]
    fn team_whitelist_intersection() {
        let mut config = config();
        config.team_whitelist = vec!["admins".to_string(), "ops".to_string()];
        let mut member = user("alice", "alice@example.com");
        member.team_memberships = vec!["dev".to_string(), "ops".to_string()];
        assert_eq!(verify_user(&member, &config), Decision::Allowed);

        let outsider = user("bob", "bob@example.com");
        assert!(matches!(
            verify_user(&outsider, &config),
            Decision::Denied(reason) if reason.contains("team")
        ));
    }

    #[test]
    fn managed_domains_allow_subdomain_email() {
        let mut config = config();
        config.domains = vec!["example.com".to_string()];
        assert_eq!(
            verify_user(&user("alice", "alice@mail.example.com"), &config),
            Decision::Allowed
        );
        assert!(matches!(
            verify_user(&user("eve", "eve@evil.org"), &config),
            Decision::Denied(reason) if reason.contains("managed domain")
        ));
    }

    #[test]
    fn nothing_configured_allows_everyone() {
        assert_eq!(
            verify_user(&user("anyone", "anyone@anywhere.org"), &config()),
            Decision::Allowed
        );
    }
}
