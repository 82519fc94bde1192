//! # Application State
//!
//! Created once at startup and shared with every handler through `Arc`. The
//! optimiser is stateless between calls, so a single instance serves all requests.

use qplan_core::{Optimiser, OptimiserConfig};
use serde::Deserialize;
use std::env;
use tracing::warn;

/// Server-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub addr: String,
    pub optimiser: OptimiserConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_string(),
            optimiser: OptimiserConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `QPLAN_ADDR`, `QPLAN_MAX_JOIN_PREDICATES` and
    /// `QPLAN_PARALLEL`. Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(addr) = lookup("QPLAN_ADDR") {
            config.addr = addr;
        }
        if let Some(raw) = lookup("QPLAN_MAX_JOIN_PREDICATES") {
            match raw.parse() {
                Ok(limit) => config.optimiser.max_join_predicates = limit,
                Err(_) => warn!(value = %raw, "ignoring invalid QPLAN_MAX_JOIN_PREDICATES"),
            }
        }
        if let Some(raw) = lookup("QPLAN_PARALLEL") {
            match raw.parse() {
                Ok(parallel) => config.optimiser.parallel = parallel,
                Err(_) => warn!(value = %raw, "ignoring invalid QPLAN_PARALLEL"),
            }
        }
        config
    }
}

pub struct AppState {
    pub optimiser: Optimiser,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            optimiser: Optimiser::new(config.optimiser.clone()),
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
