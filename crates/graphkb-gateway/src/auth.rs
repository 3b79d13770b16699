//! Source authentication.
//!
//! Sources present an API token either as `Authorization: Bearer <token>` or
//! as a `token` query parameter. The gateway only keeps BLAKE3 digests of
//! the tokens it accepts.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::Query;
use axum::http::{header, HeaderMap, Uri};

use graphkb_core::config::SourceConfig;
use graphkb_core::SourceId;

/// Errors raised while validating a credential, as opposed to the
/// credential simply being wrong.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token registry unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid token registry entry: {0}")]
    InvalidEntry(String),
}

/// Maps a presented token to the source it belongs to.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `Ok(None)` means the token is unknown.
    async fn validate(&self, token: &str) -> Result<Option<SourceId>, AuthError>;
}

/// Authenticator over a fixed set of token digests.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    sources: HashMap<blake3::Hash, SourceId>,
}

impl TokenRegistry {
    /// Build the registry from configured sources.
    pub fn from_config(sources: &[SourceConfig]) -> Result<Self, AuthError> {
        let mut registry = Self::default();
        for source in sources {
            let digest = blake3::Hash::from_hex(&source.token_blake3).map_err(|e| {
                AuthError::InvalidEntry(format!("source {}: {e}", source.name))
            })?;
            registry.insert_digest(digest, SourceId::new(&source.name))?;
        }
        Ok(registry)
    }

    /// Register a plain token for `source`.
    pub fn insert_token(&mut self, token: &str, source: SourceId) -> Result<(), AuthError> {
        self.insert_digest(hash_token(token), source)
    }

    fn insert_digest(&mut self, digest: blake3::Hash, source: SourceId) -> Result<(), AuthError> {
        if let Some(existing) = self.sources.get(&digest) {
            return Err(AuthError::InvalidEntry(format!(
                "token of {source} is already registered for {existing}"
            )));
        }
        self.sources.insert(digest, source);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl Authenticator for TokenRegistry {
    async fn validate(&self, token: &str) -> Result<Option<SourceId>, AuthError> {
        // blake3::Hash equality is constant-time.
        Ok(self.sources.get(&hash_token(token)).cloned())
    }
}

/// BLAKE3 digest of a token, as stored in configuration.
pub fn hash_token(token: &str) -> blake3::Hash {
    blake3::hash(token.as_bytes())
}

/// Pull the caller's token out of the request, if any.
///
/// The bearer scheme name is matched case-insensitively. The query
/// parameter is percent-decoded.
pub fn extract_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim_start().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params.remove("token").filter(|t| !t.is_empty())
}
