//! # Gatehouse - OAuth 2.0 authorization server library
//!
//! Build an OAuth 2.0 provider (RFC 6749) out of pluggable parts: a
//! [`Provider`] mounts an authorization endpoint and a token endpoint on an
//! axum router, issues authorization codes and signed JWT access/refresh
//! tokens, and delegates persistence, credential checking, and policy to
//! trait objects you supply.
//!
//! ## Architecture
//!
//! - `scope` - prefix-compressed action-set algebra gating every issuance
//! - `url` - strict absolute-https URLs for redirect targets
//! - `claims` / `tokenizer` - JWT claim bundles and RS256/HS256 signing
//! - `client` - registered applications and stored consents
//! - `store` - persistence seam, with an in-memory implementation
//! - `authenticator` - session verification and credential checking seam
//! - `issuer` - per-grant lifetimes and scope admissibility policy
//! - `endpoint` - the authorize/token request engines and axum handlers
//! - `provider` - assembly and route registration
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gatehouse::{MemoryStore, Provider, RemoteAuthenticator, StrictUrl};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let base = StrictUrl::parse("https://authz.example.com/oauth")?;
//! let login = StrictUrl::parse("https://authn.example.com/session")?;
//! let authenticator = RemoteAuthenticator::new(login, b"-----BEGIN PUBLIC KEY-----...".to_vec())?;
//!
//! let provider = Provider::new(base, Arc::new(authenticator), Arc::new(MemoryStore::new()));
//! let router = provider.router();
//! // serve `router` with axum
//! # Ok(())
//! # }
//! ```

pub mod authenticator;
pub mod claims;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod grant;
pub mod issuer;
pub mod provider;
pub mod scope;
pub mod store;
pub mod tokenizer;
pub mod url;

pub use authenticator::{authenticate_request, session_cookie, Authenticator, RemoteAuthenticator, SESSION_COOKIE};
pub use claims::{TokenClaims, TokenRole};
pub use client::{Authorization, Client, ClientKeys, ClientStatus};
pub use endpoint::{
    authorize, token, AuthorizeParams, AuthorizeRequest, AuthorizeResponse, TokenParams,
    TokenReply, TokenResponse,
};
pub use error::{Error, ErrorCode, ProtocolError, Result};
pub use grant::{GrantType, ResponseType};
pub use issuer::{DefaultIssuer, Issuer};
pub use provider::{Clock, Provider, SystemClock};
pub use scope::Scope;
pub use store::{MemoryStore, Store};
pub use tokenizer::{JwtTokenizer, Tokenizer};
pub use url::{NotAbsoluteUrl, StrictUrl};
