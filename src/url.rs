//! Strict redirect URLs
//!
//! Every URL the provider redirects to goes through [`StrictUrl`]. Parsing
//! normalizes aggressively rather than trusting the caller: the scheme is
//! forced to `https`, any query is cleared, and the fragment is pinned to
//! `_=_` - the marker downstream systems use to recognize OAuth redirects.
//! Relative inputs, inputs without a host, and inputs that cannot be carried
//! over https are rejected.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use url::Url;

/// The input could not be parsed as an absolute https-capable URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("url is not absolute")]
pub struct NotAbsoluteUrl;

/// An absolute https URL safe to use as an OAuth `redirect_uri`.
///
/// Equality is on the serialized form; two URLs that print the same string
/// compare equal, which is the exact-match rule the endpoints enforce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictUrl(Url);

impl StrictUrl {
    /// Parse and normalize `raw`.
    pub fn parse(raw: &str) -> Result<Self, NotAbsoluteUrl> {
        let mut url = Url::parse(raw).map_err(|_| NotAbsoluteUrl)?;
        if !url.has_host() {
            return Err(NotAbsoluteUrl);
        }
        url.set_scheme("https").map_err(|_| NotAbsoluteUrl)?;
        url.set_query(None);
        url.set_fragment(Some("_=_"));
        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The path component, used to mount the provider's routes.
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// Serialize with `params` form-encoded into the query.
    pub fn with_params(&self, params: &[(&str, String)]) -> String {
        let mut url = self.0.clone();
        match serde_urlencoded::to_string(params) {
            Ok(query) if !query.is_empty() => url.set_query(Some(&query)),
            _ => url.set_query(None),
        }
        url.to_string()
    }

    /// Serialize with `params` form-encoded into the fragment, replacing the
    /// `_=_` marker. The implicit flow delivers tokens this way.
    pub fn with_fragment(&self, params: &[(&str, String)]) -> String {
        let mut url = self.0.clone();
        match serde_urlencoded::to_string(params) {
            Ok(fragment) if !fragment.is_empty() => url.set_fragment(Some(&fragment)),
            _ => url.set_fragment(Some("_=_")),
        }
        url.to_string()
    }

    /// Serialize with a pre-encoded query carried over verbatim.
    pub fn with_raw_query(&self, raw: &str) -> String {
        let mut url = self.0.clone();
        if raw.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(raw));
        }
        url.to_string()
    }

    /// A copy of this URL with `suffix` appended to the path.
    pub fn join_path(&self, suffix: &str) -> StrictUrl {
        let mut url = self.0.clone();
        let path = format!("{}{}", url.path().trim_end_matches('/'), suffix);
        url.set_path(&path);
        Self(url)
    }
}

impl std::fmt::Display for StrictUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Serialize for StrictUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for StrictUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        StrictUrl::parse(&raw).map_err(serde::de::Error::custom)
    }
}
