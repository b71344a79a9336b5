//! Shared fixtures for endpoint integration tests
//!
//! Builds a provider over the in-memory store with an HS256 tokenizer and a
//! local stand-in authenticator, so the full authorize/token pipelines run
//! without network or RSA key generation.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use gatehouse::{
    Authenticator, Authorization, Client, ClientKeys, ClientStatus, GrantType, JwtTokenizer,
    MemoryStore, Provider, Scope, StrictUrl, TokenClaims, TokenRole, Tokenizer,
};

/// Shared secret between the test authenticator and its session tokens.
pub const SESSION_KEY: &[u8] = b"monkeys";

/// Shared secret every test client signs its tokens with.
pub const CLIENT_KEY: &[u8] = b"client-signing-secret";

/// The password the test authenticator accepts.
pub const GOOD_PASSWORD: &str = "letmein";

pub const PROVIDER_URL: &str = "https://authz.example.com";
pub const AUTHN_URL: &str = "https://authn.example.com";
pub const REDIRECT_URI: &str = "https://example.com";

/// Authenticator accepting any username with [`GOOD_PASSWORD`], sessions
/// signed HS256 with [`SESSION_KEY`].
pub struct TestAuthenticator {
    url: StrictUrl,
    tokenizer: JwtTokenizer,
}

impl TestAuthenticator {
    pub fn new() -> Self {
        Self {
            url: StrictUrl::parse(AUTHN_URL).unwrap(),
            tokenizer: JwtTokenizer::hs256(),
        }
    }
}

#[async_trait]
impl Authenticator for TestAuthenticator {
    async fn verify(
        &self,
        session: &str,
        _client: &Client,
    ) -> gatehouse::Result<Option<TokenClaims>> {
        let Ok(claims) = self.tokenizer.parse(session, SESSION_KEY) else {
            return Ok(None);
        };
        if claims.expired_at(Utc::now()) || claims.issuer != self.url.as_str() {
            return Ok(None);
        }
        Ok(Some(claims))
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        client: &Client,
    ) -> gatehouse::Result<Option<TokenClaims>> {
        if password != GOOD_PASSWORD {
            return Ok(None);
        }
        let now = Utc::now();
        let mut claims = TokenClaims::new(TokenRole::Identity, now, now + Duration::hours(1));
        claims.issuer = self.url.to_string();
        claims.subject = username.to_owned();
        claims.audience = client.id.clone();
        Ok(Some(claims))
    }
}

/// A provider over a fresh in-memory store, HS256-tokenized.
pub fn test_provider() -> (Provider, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let provider = Provider::new(
        StrictUrl::parse(PROVIDER_URL).unwrap(),
        Arc::new(TestAuthenticator::new()),
        Arc::clone(&store) as Arc<dyn gatehouse::Store>,
    )
    .with_tokenizer(Arc::new(JwtTokenizer::hs256()));
    (provider, store)
}

/// Register an active client with symmetric keys and the given scope.
pub async fn register_client(store: &MemoryStore, grant_type: GrantType, scope: &str) -> Client {
    use gatehouse::Store;

    let client = Client {
        id: uuid::Uuid::new_v4().to_string(),
        display_name: "Test Client".to_owned(),
        secret: "s3cret".to_owned(),
        grant_type,
        redirect_uri: StrictUrl::parse(REDIRECT_URI).unwrap(),
        scope: Scope::parse(scope),
        status: ClientStatus::Active,
        created: Utc::now(),
        keys: ClientKeys::symmetric(CLIENT_KEY.to_vec()),
    };
    store.create_client(client.clone()).await.unwrap();
    client
}

/// Pre-store consent for `(client, user)` at exactly `scope`.
pub async fn store_consent(store: &MemoryStore, client: &Client, user: &str, scope: &str) {
    use gatehouse::Store;

    store
        .store_authorization(Authorization::new(
            client.id.clone(),
            user.to_owned(),
            Scope::parse(scope),
        ))
        .await
        .unwrap();
}

/// A valid signed session cookie value for `subject`.
pub fn mint_session(subject: &str, client: &Client) -> String {
    let now = Utc::now();
    let mut claims = TokenClaims::new(TokenRole::Identity, now, now + Duration::hours(1));
    claims.issuer = StrictUrl::parse(AUTHN_URL).unwrap().to_string();
    claims.subject = subject.to_owned();
    claims.audience = client.id.clone();
    JwtTokenizer::hs256().tokenize(&claims, SESSION_KEY).unwrap()
}

/// An already-expired session cookie value.
pub fn mint_expired_session(subject: &str, client: &Client) -> String {
    let now = Utc::now();
    let mut claims = TokenClaims::new(
        TokenRole::Identity,
        now - Duration::hours(2),
        now - Duration::hours(1),
    );
    claims.issuer = StrictUrl::parse(AUTHN_URL).unwrap().to_string();
    claims.subject = subject.to_owned();
    claims.audience = client.id.clone();
    JwtTokenizer::hs256().tokenize(&claims, SESSION_KEY).unwrap()
}

/// Parse the query of a redirect location into key/value pairs.
pub fn query_pairs(location: &str) -> Vec<(String, String)> {
    let url = url::Url::parse(location).unwrap();
    url.query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

pub fn query_value(location: &str, key: &str) -> Option<String> {
    query_pairs(location)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

/// Parse the fragment of a redirect location into key/value pairs.
pub fn fragment_pairs(location: &str) -> Vec<(String, String)> {
    let url = url::Url::parse(location).unwrap();
    let fragment = url.fragment().unwrap_or_default();
    serde_urlencoded::from_str::<Vec<(String, String)>>(fragment).unwrap()
}

pub fn fragment_value(location: &str, key: &str) -> Option<String> {
    fragment_pairs(location)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}
