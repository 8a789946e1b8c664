//! # Session Token
//!
//! `session_token` mints and verifies the signed JWT carried in the vouch
//! session cookie. The token embeds the authenticated identity, any custom
//! claims returned by the identity provider, and (when the operator opts in)
//! the provider's own access/id tokens for downstream applications.
//!
//! Tokens are signed with **HS256** (shared secret) by default, or **RS256**
//! when an RSA key pair is configured. All vouch instances behind the same
//! front door must share the same key material so a cookie minted by one
//! instance verifies on any other.
//!
//! Verification returns a structured [`Error`] so callers can distinguish a
//! retriable failure (`Expired`, send the user back through login) from a
//! fatal one (`BadSignature`, clear the cookie).

mod claims;
mod jwt;

pub use claims::{PTokens, SessionClaims};
pub use jwt::{Error, Signer, TokenHeader};
