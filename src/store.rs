//! Storage interface
//!
//! The provider persists three things: registered clients, consent records,
//! and token state (issued access-token claims plus the blacklist of spent
//! ids). [`Store`] abstracts over the backend; [`MemoryStore`] is the
//! built-in single-process implementation used in tests and small
//! deployments.
//!
//! Contract notes:
//! - Absent records come back as `Ok(None)` / `Ok(false)`, never as errors.
//! - Writes are atomic per key; concurrent readers and writers are allowed.
//! - [`Store::consume_token`] must linearize the blacklist check-and-insert
//!   per id: of two concurrent calls for the same id exactly one returns
//!   `true`. The single-use guarantee for authorization codes and refresh
//!   tokens rests on this.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::claims::TokenClaims;
use crate::client::{Authorization, Client};
use crate::error::{Error, Result};

/// Persistence capability required by a provider.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_client(&self, client: Client) -> Result<()>;
    async fn fetch_client(&self, id: &str) -> Result<Option<Client>>;
    async fn delete_client(&self, id: &str) -> Result<()>;

    /// Record issued access-token claims by `jti` so the refresh grant can
    /// recover the original subject and scope later.
    async fn record_token(&self, claims: TokenClaims) -> Result<()>;
    async fn fetch_token(&self, jti: &str) -> Result<Option<TokenClaims>>;

    async fn blacklist_token(&self, jti: &str) -> Result<()>;
    async fn token_blacklisted(&self, jti: &str) -> Result<bool>;

    /// Atomically blacklist `jti` if it is not blacklisted yet.
    ///
    /// Returns `true` iff this call newly consumed the id. Implementations
    /// must make the check-and-insert linearizable per id.
    async fn consume_token(&self, jti: &str) -> Result<bool>;

    /// Store a consent record, replacing any prior record for the same
    /// `(client_id, user_id)` pair.
    async fn store_authorization(&self, authorization: Authorization) -> Result<()>;
    async fn fetch_authorization(
        &self,
        client_id: &str,
        user_id: &str,
    ) -> Result<Option<Authorization>>;
}

#[derive(Default)]
struct Tables {
    clients: HashMap<String, Client>,
    authorizations: HashMap<(String, String), Authorization>,
    tokens: HashMap<String, TokenClaims>,
    blacklist: HashSet<String>,
}

/// In-memory store: one mutex over plain maps.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| Error::Store("memory store mutex poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_client(&self, client: Client) -> Result<()> {
        self.locked()?.clients.insert(client.id.clone(), client);
        Ok(())
    }

    async fn fetch_client(&self, id: &str) -> Result<Option<Client>> {
        Ok(self.locked()?.clients.get(id).cloned())
    }

    async fn delete_client(&self, id: &str) -> Result<()> {
        self.locked()?.clients.remove(id);
        Ok(())
    }

    async fn record_token(&self, claims: TokenClaims) -> Result<()> {
        self.locked()?.tokens.insert(claims.id.clone(), claims);
        Ok(())
    }

    async fn fetch_token(&self, jti: &str) -> Result<Option<TokenClaims>> {
        Ok(self.locked()?.tokens.get(jti).cloned())
    }

    async fn blacklist_token(&self, jti: &str) -> Result<()> {
        self.locked()?.blacklist.insert(jti.to_owned());
        Ok(())
    }

    async fn token_blacklisted(&self, jti: &str) -> Result<bool> {
        Ok(self.locked()?.blacklist.contains(jti))
    }

    async fn consume_token(&self, jti: &str) -> Result<bool> {
        // One guard across check and insert keeps the pair linearizable.
        Ok(self.locked()?.blacklist.insert(jti.to_owned()))
    }

    async fn store_authorization(&self, authorization: Authorization) -> Result<()> {
        let key = (
            authorization.client_id.clone(),
            authorization.user_id.clone(),
        );
        self.locked()?.authorizations.insert(key, authorization);
        Ok(())
    }

    async fn fetch_authorization(
        &self,
        client_id: &str,
        user_id: &str,
    ) -> Result<Option<Authorization>> {
        let key = (client_id.to_owned(), user_id.to_owned());
        Ok(self.locked()?.authorizations.get(&key).cloned())
    }
}
