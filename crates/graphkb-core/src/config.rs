//! Configuration management for GraphKB services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (GRAPHKB_ prefix, `__` as separator)
//! 2. Config file (graphkb.toml)
//! 3. Defaults

use std::collections::HashSet;
use std::net::SocketAddr;

use serde::Deserialize;

use crate::error::GraphKbError;

/// Update gateway configuration.
///
/// Loaded from the `[gateway]` section of `graphkb.toml` or
/// `GRAPHKB_GATEWAY__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Maximum number of graph updates processed concurrently, across all
    /// update endpoints. Requests beyond this are rejected, never queued.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_updates: usize,

    /// Upper bound on an update request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Data sources allowed to push updates.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// A data source and the digest of its API token.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source name; every mutation from this source is scoped to it.
    pub name: String,

    /// Lowercase hex BLAKE3 digest of the source's token.
    pub token_blake3: String,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8090))
}

fn default_max_concurrent() -> usize {
    4
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_concurrent_updates: default_max_concurrent(),
            max_body_bytes: default_max_body_bytes(),
            sources: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Load the `[gateway]` section from `<file_prefix>.toml` and the
    /// environment. A missing section yields the defaults.
    pub fn load(file_prefix: &str) -> Result<Self, GraphKbError> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("GRAPHKB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let gateway = match cfg.get::<GatewayConfig>("gateway") {
            Ok(c) => c,
            Err(config::ConfigError::NotFound(_)) => GatewayConfig::default(),
            Err(e) => return Err(e.into()),
        };

        gateway.validate()?;
        Ok(gateway)
    }

    /// Reject configurations the gateway cannot run with.
    pub fn validate(&self) -> Result<(), GraphKbError> {
        if self.max_concurrent_updates == 0 {
            return Err(GraphKbError::Config(
                "gateway.max_concurrent_updates must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_updates > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(GraphKbError::Config(format!(
                "gateway.max_concurrent_updates must be at most {}",
                tokio::sync::Semaphore::MAX_PERMITS
            )));
        }
        if self.max_body_bytes == 0 {
            return Err(GraphKbError::Config(
                "gateway.max_body_bytes must be at least 1".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut digests = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(GraphKbError::Config("source name must not be empty".to_string()));
            }
            if !is_blake3_hex(&source.token_blake3) {
                return Err(GraphKbError::Config(format!(
                    "source {}: token_blake3 must be 64 lowercase hex characters",
                    source.name
                )));
            }
            if !names.insert(source.name.as_str()) {
                return Err(GraphKbError::Config(format!(
                    "source {} is configured twice",
                    source.name
                )));
            }
            if !digests.insert(source.token_blake3.as_str()) {
                return Err(GraphKbError::Config(format!(
                    "source {} reuses the token of another source",
                    source.name
                )));
            }
        }

        if self.sources.is_empty() {
            tracing::warn!("No sources configured, every update will be rejected");
        }

        Ok(())
    }
}

fn is_blake3_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
