//! Provider assembly
//!
//! A [`Provider`] wires the collaborators together - store, authenticator,
//! tokenizer, issuance policy, clock - and registers the two endpoints on an
//! axum router. Everything is a per-provider field built at construction;
//! there are no process-wide defaults.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};

use crate::authenticator::Authenticator;
use crate::endpoint;
use crate::issuer::{DefaultIssuer, Issuer};
use crate::store::Store;
use crate::tokenizer::{JwtTokenizer, Tokenizer};
use crate::url::StrictUrl;

/// Time source, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// An OAuth 2.0 authorization server for one base URL.
///
/// Cheap to clone; all collaborators are shared behind `Arc`.
#[derive(Clone)]
pub struct Provider {
    url: StrictUrl,
    store: Arc<dyn Store>,
    authenticator: Arc<dyn Authenticator>,
    tokenizer: Arc<dyn Tokenizer>,
    issuer: Arc<dyn Issuer>,
    clock: Arc<dyn Clock>,
}

impl Provider {
    /// A provider with the default RS256 tokenizer, stock issuance policy,
    /// and wall-clock time.
    pub fn new(
        url: StrictUrl,
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            url,
            store,
            authenticator,
            tokenizer: Arc::new(JwtTokenizer::rs256()),
            issuer: Arc::new(DefaultIssuer),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_issuer(mut self, issuer: Arc<dyn Issuer>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The base URL; every token this provider mints carries it as `iss`.
    pub fn url(&self) -> &StrictUrl {
        &self.url
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    pub fn issuer(&self) -> &dyn Issuer {
        self.issuer.as_ref()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The consent dialog URL carrying the original request parameters.
    pub fn dialog_url(&self, raw_query: &str) -> String {
        self.url.join_path("/dialog").with_raw_query(raw_query)
    }

    /// Register `{path}/authorize` (GET and POST) and `{path}/token`
    /// (POST only; the method router answers 405 elsewhere).
    pub fn router(self) -> Router {
        let base = self.url.path().trim_end_matches('/').to_owned();
        Router::new()
            .route(
                &format!("{base}/authorize"),
                get(endpoint::authorize_handler).post(endpoint::authorize_handler),
            )
            .route(&format!("{base}/token"), post(endpoint::token_handler))
            .with_state(self)
    }
}
