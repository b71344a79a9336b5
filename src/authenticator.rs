//! Resource owner authentication
//!
//! The provider never checks credentials itself. An [`Authenticator`]
//! answers two questions: does this signed session belong to a live user
//! (`verify`), and do these credentials (`authenticate`, for the password
//! grant) identify one. Both return identity claims or `None`; transport
//! failures are errors.
//!
//! Sessions travel as a `sid` cookie holding a signed identity JWT minted by
//! the login service. Production deployments are expected to mark it
//! `HttpOnly` and `Secure`; that is a deployment contract, not something the
//! library can observe on an inbound request.

use async_trait::async_trait;
use http::header::COOKIE;
use http::HeaderMap;
use jsonwebtoken::Algorithm;
use tracing::debug;

use crate::claims::TokenClaims;
use crate::client::Client;
use crate::error::Result;
use crate::tokenizer::{JwtTokenizer, Tokenizer};
use crate::url::StrictUrl;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sid";

/// Verifies sessions and checks credentials for a provider.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Parse a signed session and return its identity claims, or `None` if
    /// the session is invalid or expired.
    async fn verify(&self, session: &str, client: &Client) -> Result<Option<TokenClaims>>;

    /// Check credentials out of band and return identity claims, or `None`
    /// when they are wrong.
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        client: &Client,
    ) -> Result<Option<TokenClaims>>;
}

/// Extract the `sid` cookie value from request headers.
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some(value) = pair.trim().strip_prefix("sid=") {
                if !value.is_empty() {
                    return Some(value.to_owned());
                }
            }
        }
    }
    None
}

/// Resolve the session carried by a request: no cookie means no session.
pub async fn authenticate_request(
    authenticator: &dyn Authenticator,
    headers: &HeaderMap,
    client: &Client,
) -> Result<Option<TokenClaims>> {
    match session_cookie(headers) {
        Some(sid) => authenticator.verify(&sid, client).await,
        None => Ok(None),
    }
}

/// Authenticator backed by an external login service.
///
/// `verify` checks session JWTs against the service's verification key;
/// `authenticate` posts credentials to the service and verifies the `sid`
/// cookie it sets on success.
pub struct RemoteAuthenticator {
    endpoint: StrictUrl,
    tokenizer: JwtTokenizer,
    verify_key: Vec<u8>,
    http: reqwest::Client,
}

impl RemoteAuthenticator {
    /// A remote authenticator verifying RS256 session tokens.
    pub fn new(endpoint: StrictUrl, verify_key: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_algorithm(endpoint, verify_key, Algorithm::RS256)
    }

    /// Same, with an explicit session algorithm (HS256 for shared-secret
    /// login services).
    pub fn with_algorithm(
        endpoint: StrictUrl,
        verify_key: impl Into<Vec<u8>>,
        algorithm: Algorithm,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            endpoint,
            tokenizer: JwtTokenizer::new(algorithm),
            verify_key: verify_key.into(),
            http,
        })
    }

    async fn csrf_token(&self) -> Result<Option<String>> {
        let url = self.endpoint.join_path("/csrf");
        let response = self.http.get(url.as_str()).send().await?;
        let token = response
            .headers()
            .get("x-csrf-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(token)
    }
}

#[async_trait]
impl Authenticator for RemoteAuthenticator {
    async fn verify(&self, session: &str, _client: &Client) -> Result<Option<TokenClaims>> {
        let claims = match self.tokenizer.parse(session, &self.verify_key) {
            Ok(claims) => claims,
            Err(err) => {
                debug!(error = %err, "session token rejected");
                return Ok(None);
            }
        };
        if claims.expired_at(chrono::Utc::now()) || claims.issuer != self.endpoint.as_str() {
            return Ok(None);
        }
        Ok(Some(claims))
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        client: &Client,
    ) -> Result<Option<TokenClaims>> {
        let mut request = self
            .http
            .post(self.endpoint.as_str())
            .json(&serde_json::json!({ "username": username, "password": password }));
        if let Some(csrf) = self.csrf_token().await? {
            request = request.header("x-csrf-token", csrf);
        }

        let response = request.send().await?;
        let sid = response
            .cookies()
            .find(|cookie| cookie.name() == SESSION_COOKIE)
            .map(|cookie| cookie.value().to_owned());

        match sid {
            Some(sid) => self.verify(&sid, client).await,
            None => Ok(None),
        }
    }
}
