//! Grant and response type vocabulary
//!
//! The wire strings of RFC 6749 expressed as closed sums, so the endpoint
//! engines dispatch with exhaustive matches instead of string tables.

use serde::{Deserialize, Serialize};

/// The grant under which a client is registered and tokens are minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    AuthorizationCode,
    Implicit,
    Password,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    /// The wire spelling used in forms and claims.
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::Implicit => "implicit",
            GrantType::Password => "password",
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }

    /// Resolve a `grant_type` form parameter.
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "authorization_code" => Some(GrantType::AuthorizationCode),
            "implicit" => Some(GrantType::Implicit),
            "password" => Some(GrantType::Password),
            "client_credentials" => Some(GrantType::ClientCredentials),
            "refresh_token" => Some(GrantType::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `response_type` parameter of the authorization endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    /// `code` - the authorization code flow.
    Code,
    /// `token` - the implicit flow.
    Token,
}

impl ResponseType {
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "code" => Some(ResponseType::Code),
            "token" => Some(ResponseType::Token),
            _ => None,
        }
    }
}
