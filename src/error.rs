//! Error taxonomy
//!
//! Two kinds of failure flow through the endpoints and they are deliberately
//! separate types:
//!
//! - [`ProtocolError`] is a *presented* OAuth 2.0 error (RFC 6749 §4.1.2.1 /
//!   §5.2): it becomes an error redirect on the authorization endpoint or a
//!   JSON body on the token endpoint, and it never aborts the handler.
//! - [`Error`] is an *infrastructure* failure (store, tokenizer, credential
//!   backend). It propagates out of the engines with `?` and is rendered
//!   generically as `server_error`; descriptions never leak internals.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure failure raised by a collaborator of the provider.
#[derive(Debug, Error)]
pub enum Error {
    /// Claims were submitted for signing without an expiry.
    #[error("token expiry not set")]
    ExpiryNotSet,

    /// A token's algorithm header does not match the tokenizer's algorithm.
    #[error("unexpected signing algorithm")]
    AlgorithmMismatch,

    /// Signing, verification, or claim decoding failed.
    #[error("token handling failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Client keypair generation or encoding failed.
    #[error("key handling failed: {0}")]
    Keys(String),

    /// A storage backend operation failed.
    #[error("store operation failed: {0}")]
    Store(String),

    /// The authentication backend failed (as opposed to rejecting credentials).
    #[error("authenticator failed: {0}")]
    Authenticator(String),

    /// An outbound HTTP call failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// RFC 6749 error codes as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AccessDenied,
    InvalidClient,
    InvalidGrant,
    InvalidRequest,
    InvalidScope,
    ServerError,
    TemporarilyUnavailable,
    UnauthorizedClient,
    UnsupportedGrantType,
    UnsupportedResponseType,
}

impl ErrorCode {
    /// The wire spelling of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AccessDenied => "access_denied",
            ErrorCode::InvalidClient => "invalid_client",
            ErrorCode::InvalidGrant => "invalid_grant",
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::InvalidScope => "invalid_scope",
            ErrorCode::ServerError => "server_error",
            ErrorCode::TemporarilyUnavailable => "temporarily_unavailable",
            ErrorCode::UnauthorizedClient => "unauthorized_client",
            ErrorCode::UnsupportedGrantType => "unsupported_grant_type",
            ErrorCode::UnsupportedResponseType => "unsupported_response_type",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol-level error presented to the client.
///
/// Serializes as `{"error": ..., "error_description": ...}` for the token
/// endpoint; [`ProtocolError::params`] produces the key/value pairs appended
/// to a `redirect_uri` by the authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolError {
    #[serde(rename = "error")]
    pub code: ErrorCode,
    #[serde(rename = "error_description", skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip)]
    pub state: Option<String>,
}

impl ProtocolError {
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            state: None,
        }
    }

    /// Attach the request's `state` so redirects echo it back.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Key/value pairs for the authorization endpoint's error redirect.
    ///
    /// `state` is always present, empty if the request carried none.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error", self.code.as_str().to_owned()),
            ("error_description", self.description.clone()),
            ("state", self.state.clone().unwrap_or_default()),
        ]
    }

    pub fn client_not_found() -> Self {
        Self::new(ErrorCode::InvalidClient, "client not found")
    }

    pub fn bad_redirect() -> Self {
        Self::new(ErrorCode::InvalidRequest, "invalid redirect uri")
    }

    pub fn scope_not_allowed() -> Self {
        Self::new(ErrorCode::InvalidScope, "client cannot issue requested scope")
    }

    pub fn wrong_grant() -> Self {
        Self::new(ErrorCode::InvalidRequest, "client cannot use specified grant type")
    }

    pub fn invalid_grant() -> Self {
        Self::new(ErrorCode::InvalidGrant, "invalid grant type")
    }

    pub fn code_used() -> Self {
        Self::new(ErrorCode::InvalidRequest, "code already used")
    }

    pub fn refresh_used() -> Self {
        Self::new(ErrorCode::InvalidRequest, "refresh token already used")
    }

    pub fn access_denied() -> Self {
        Self::new(ErrorCode::AccessDenied, "access denied")
    }

    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::UnauthorizedClient, "client not authorized")
    }

    pub fn unsupported_response_type() -> Self {
        Self::new(ErrorCode::UnsupportedResponseType, "unsupported response type")
    }

    pub fn unexpected() -> Self {
        Self::new(ErrorCode::ServerError, "unexpected error occurred")
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.code, self.description)
    }
}
