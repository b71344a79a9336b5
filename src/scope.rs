//! Scope algebra
//!
//! A [`Scope`] is an unordered set of action identifiers such as `user` or
//! `user:email`. Actions are hierarchical: holding `user` subsumes every
//! `user:*` action, so the set is kept prefix-compressed - inserting
//! `user:email` into a set holding `user` is a no-op, and inserting `user`
//! drops any `user:*` entries already present.
//!
//! The canonical form is sorted and duplicate-free, which makes the
//! serialized string (comma-separated) deterministic across insertions in
//! any order.

use std::collections::BTreeSet;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// A prefix-compressed set of action identifiers bounding an authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    actions: BTreeSet<String>,
}

/// An action is one or more alphabetic segments joined by `:`.
fn valid_action(action: &str) -> bool {
    !action.is_empty()
        && action
            .split(':')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphabetic()))
}

/// Proper prefixes of `action` at `:` boundaries, e.g. `a:b:c` -> `a`, `a:b`.
fn proper_prefixes(action: &str) -> impl Iterator<Item = &str> {
    action.match_indices(':').map(move |(i, _)| &action[..i])
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated action list. Malformed actions are dropped.
    pub fn parse(raw: &str) -> Self {
        let mut scope = Scope::new();
        for action in raw.split(',') {
            scope.add(action.trim());
        }
        scope
    }

    /// Insert an action, keeping the set canonical.
    ///
    /// Idempotent and order-independent: if any proper prefix of `action` is
    /// already present the insertion is a no-op, and inserting an action
    /// removes the entries it subsumes.
    pub fn add(&mut self, action: &str) {
        if !valid_action(action) {
            return;
        }
        if self.actions.contains(action)
            || proper_prefixes(action).any(|p| self.actions.contains(p))
        {
            return;
        }
        let subsumed = format!("{action}:");
        self.actions.retain(|a| !a.starts_with(&subsumed));
        self.actions.insert(action.to_owned());
    }

    /// Whether the set grants `op`: true if `op` or any of its prefixes is
    /// present.
    pub fn has(&self, op: &str) -> bool {
        self.actions.contains(op) || proper_prefixes(op).any(|p| self.actions.contains(p))
    }

    /// Whether every action of `other` is granted by this set.
    pub fn contains(&self, other: &Scope) -> bool {
        other.actions.iter().all(|a| self.has(a))
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// The canonical actions, in sorted order.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for action in &self.actions {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(action)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Scope::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_canonical_and_permutation_invariant() {
        let a = Scope::parse("user:email,order,user:friends");
        let b = Scope::parse("order, user:friends ,user:email");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "order,user:email,user:friends");
    }

    #[test]
    fn parse_drops_invalid_actions() {
        let scope = Scope::parse("a!!,b, c-d, e");
        assert_eq!(scope.to_string(), "b,e");

        let scope = Scope::parse("00user,user_email,ok");
        assert_eq!(scope.to_string(), "ok");

        assert!(Scope::parse("").is_empty());
        assert!(Scope::parse(",,").is_empty());
    }

    #[test]
    fn parse_is_idempotent() {
        assert_eq!(Scope::parse("a,a,b"), Scope::parse("a,b"));
    }

    #[test]
    fn add_compresses_prefixes_in_both_orders() {
        let wide_first = Scope::parse("a,a:b");
        assert_eq!(wide_first.to_string(), "a");

        let narrow_first = Scope::parse("a:b,a");
        assert_eq!(narrow_first.to_string(), "a");

        let deep = Scope::parse("a:b:c,a:b,x:y");
        assert_eq!(deep.to_string(), "a:b,x:y");
    }

    #[test]
    fn has_walks_prefixes() {
        let scope = Scope::parse("user,order:cancel");
        assert!(scope.has("user"));
        assert!(scope.has("user:email"));
        assert!(scope.has("user:email:primary"));
        assert!(scope.has("order:cancel"));
        assert!(!scope.has("order"));
        assert!(!scope.has("payments"));
    }

    #[test]
    fn contains_applies_the_prefix_rule() {
        assert!(Scope::parse("a").contains(&Scope::parse("a:b")));
        assert!(!Scope::parse("a:b").contains(&Scope::parse("a")));

        let parent = Scope::parse("user,order:cancel,report");
        assert!(parent.contains(&Scope::parse("order:cancel,report")));
        assert!(parent.contains(&Scope::parse("user:email,report")));
        assert!(!parent.contains(&Scope::parse("order:cancel,admin")));
        assert!(parent.contains(&Scope::parse("")));
        assert!(Scope::parse("").contains(&Scope::parse("")));
    }

    #[test]
    fn equality_is_set_equality() {
        assert_eq!(Scope::parse("a,b"), Scope::parse("b,a"));
        assert_ne!(Scope::parse("a,b"), Scope::parse("a,b,c"));
    }

    #[test]
    fn serde_round_trips_the_canonical_string() {
        let scope = Scope::parse("user:email,order,user:friends");
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, "\"order,user:email,user:friends\"");

        let back: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scope);
    }
}
