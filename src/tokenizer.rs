//! Token signing and parsing
//!
//! The [`Tokenizer`] turns [`TokenClaims`] into compact signed JWTs and back.
//! The algorithm is fixed per instance: a tokenizer built for RS256 refuses
//! tokens whose header claims anything else, closing the classic algorithm
//! confusion hole. RS256 is the default; HS256 exists for session-verifying
//! authenticators that share a secret with the login service.
//!
//! `parse` judges the algorithm header, the signature, and the payload shape
//! only. Expiry is the engines' business - an expired code must surface as
//! `access_denied`, not as a parse failure.

use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::claims::TokenClaims;
use crate::error::{Error, Result};

/// Signs and verifies claim bundles as compact signed strings.
///
/// Sign/verify are CPU-bound and synchronous; callers on async paths treat
/// them as plain compute.
pub trait Tokenizer: Send + Sync {
    /// Sign `claims` with `signing_key`. Fails if no expiry is set.
    fn tokenize(&self, claims: &TokenClaims, signing_key: &[u8]) -> Result<String>;

    /// Verify `raw` against `verify_key` and decode the claims.
    fn parse(&self, raw: &str, verify_key: &[u8]) -> Result<TokenClaims>;
}

/// JWT tokenizer over `jsonwebtoken`, pinned to one algorithm.
#[derive(Debug, Clone)]
pub struct JwtTokenizer {
    algorithm: Algorithm,
}

impl JwtTokenizer {
    /// A tokenizer for the given algorithm. Only RS256 and HS256 are
    /// meaningful here; anything else is refused at key construction.
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }

    /// The default: RSA-SHA256 with PEM-encoded keys.
    pub fn rs256() -> Self {
        Self::new(Algorithm::RS256)
    }

    /// HMAC-SHA256 with a shared secret.
    pub fn hs256() -> Self {
        Self::new(Algorithm::HS256)
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn encoding_key(&self, key: &[u8]) -> Result<EncodingKey> {
        match self.algorithm {
            Algorithm::HS256 => Ok(EncodingKey::from_secret(key)),
            Algorithm::RS256 => EncodingKey::from_rsa_pem(key).map_err(Error::from),
            _ => Err(Error::AlgorithmMismatch),
        }
    }

    fn decoding_key(&self, key: &[u8]) -> Result<DecodingKey> {
        match self.algorithm {
            Algorithm::HS256 => Ok(DecodingKey::from_secret(key)),
            Algorithm::RS256 => DecodingKey::from_rsa_pem(key).map_err(Error::from),
            _ => Err(Error::AlgorithmMismatch),
        }
    }
}

impl Tokenizer for JwtTokenizer {
    fn tokenize(&self, claims: &TokenClaims, signing_key: &[u8]) -> Result<String> {
        if claims.expires == 0 {
            return Err(Error::ExpiryNotSet);
        }
        let mut header = Header::new(self.algorithm);
        header.typ = Some("jwt".to_owned());
        let key = self.encoding_key(signing_key)?;
        Ok(encode(&header, claims, &key)?)
    }

    fn parse(&self, raw: &str, verify_key: &[u8]) -> Result<TokenClaims> {
        let header = decode_header(raw)?;
        if header.alg != self.algorithm {
            return Err(Error::AlgorithmMismatch);
        }

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let key = self.decoding_key(verify_key)?;
        let data = decode::<TokenClaims>(raw, &key, &validation)?;
        Ok(data.claims)
    }
}
