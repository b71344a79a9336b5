//! Token claims
//!
//! [`TokenClaims`] is the payload of everything the provider signs: session
//! identities, authorization codes, access tokens, and refresh tokens. The
//! `role` claim says which one a given bundle is; the engines refuse tokens
//! presented in the wrong role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grant::GrantType;
use crate::scope::Scope;

/// What a signed claim bundle is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRole {
    /// A user session minted by an authenticator.
    Identity,
    /// An authorization code, exchangeable exactly once.
    Code,
    /// A bearer access token.
    AccessToken,
    /// A refresh token; its `sub` holds the access token id it renews.
    RefreshToken,
}

/// The signed claim bundle (RFC 7519 names on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Unique token id; the replay key for the blacklist.
    #[serde(rename = "jti")]
    pub id: String,
    pub role: TokenRole,
    /// The client this token was minted for.
    #[serde(rename = "aud", default)]
    pub audience: String,
    /// Expiry, epoch seconds. Must be set before signing.
    #[serde(rename = "exp")]
    pub expires: i64,
    /// Issue time, epoch seconds.
    #[serde(rename = "iat")]
    pub issued: i64,
    /// The provider (or authenticator) base URL.
    #[serde(rename = "iss", default)]
    pub issuer: String,
    /// The resource owner, or the client id for client-credentials tokens.
    #[serde(rename = "sub", default)]
    pub subject: String,
    /// The grant this token was minted under. Absent on identity claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<GrantType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl TokenClaims {
    /// Fresh claims with a random `jti` and the given lifetime. Audience,
    /// issuer, and subject start empty; callers fill what applies.
    pub fn new(role: TokenRole, issued: DateTime<Utc>, expires: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            audience: String::new(),
            expires: expires.timestamp(),
            issued: issued.timestamp(),
            issuer: String::new(),
            subject: String::new(),
            grant: None,
            scope: None,
            nonce: None,
        }
    }

    /// Whether the claims are expired at `now`.
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now.timestamp()
    }
}
