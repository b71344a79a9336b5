//! Issuance policy
//!
//! How long codes and tokens live, and which scopes may be issued under
//! which grant. Policy is per provider; the built-in [`DefaultIssuer`]
//! permits every scope and uses the stock lifetimes.

use chrono::Duration;

use crate::grant::GrantType;
use crate::scope::Scope;

/// Per-provider issuance policy.
pub trait Issuer: Send + Sync {
    /// Lifetime of authorization codes.
    fn expiry_for_code(&self) -> Duration;

    /// Lifetime of tokens minted under `grant`.
    fn expiry_for_token(&self, grant: GrantType) -> Duration;

    /// Whether `scope` may be issued under `grant`. Deployments override
    /// this to fence scopes off from particular grants.
    fn scope_permitted(&self, _scope: &Scope, _grant: GrantType) -> bool {
        true
    }
}

/// Stock policy: hour-long codes, short implicit tokens, long-lived refresh
/// tokens, a day for everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIssuer;

impl Issuer for DefaultIssuer {
    fn expiry_for_code(&self) -> Duration {
        Duration::minutes(60)
    }

    fn expiry_for_token(&self, grant: GrantType) -> Duration {
        match grant {
            GrantType::Implicit => Duration::hours(2),
            GrantType::RefreshToken => Duration::days(60),
            _ => Duration::hours(24),
        }
    }
}
