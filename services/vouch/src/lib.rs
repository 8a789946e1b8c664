//! # Vouch (SSO Authentication Proxy)
//!
//! `vouch` terminates and delegates user authentication for a fleet of HTTP
//! web applications sitting behind a reverse proxy (nginx `auth_request`,
//! Traefik `forwardAuth`). The reverse proxy asks one question per inbound
//! request, "is this request authenticated, and if so as whom?", and vouch
//! answers with a 200 plus identity headers or a 401 that triggers a login
//! redirect.
//!
//! On a fresh session vouch drives the OAuth2 / OpenID Connect exchange with
//! an external identity provider, authorizes the returned identity against
//! the configured policy, and mints a signed session token (see the
//! `session_token` crate) stored as a cookie on a parent domain so it is
//! shared across all protected applications.
//!
//! ## Request flow
//!
//! ```text
//! reverse proxy -> /validate -> 200 + identity headers   (valid cookie)
//!                            -> 401                      (no/bad cookie)
//! browser -> /login?url=...  -> 302 to IdP authorize URL
//! IdP     -> /auth?code&state-> exchange, authorize, mint, set cookie,
//!                               302 to the originally requested URL
//! browser -> /logout         -> clear cookie chunks
//! ```

pub mod cli;
pub mod vouch;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
