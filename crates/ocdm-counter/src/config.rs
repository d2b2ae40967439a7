//! Counter store configuration via TOML.
//!
//! Selects one backend and its parameters:
//!
//! ```toml
//! # "volatile", "filesystem" or "redis"
//! backend = "filesystem"
//! info_dir = "/srv/counters/060"
//! supplier_prefix = "060"
//! ```
//!
//! ```toml
//! backend = "redis"
//! url = "redis://127.0.0.1:6379/0"
//! supplier_prefix = "060"
//! ```

use crate::CounterError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which backend to open, and how.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum CounterConfig {
    /// In-memory counters, lost when the process exits.
    #[default]
    Volatile,
    /// Fixed-width record files under `info_dir`.
    Filesystem {
        info_dir: PathBuf,
        #[serde(default)]
        supplier_prefix: String,
    },
    /// Counters in a Redis-compatible server.
    Redis {
        url: String,
        #[serde(default)]
        supplier_prefix: String,
    },
}

impl CounterConfig {
    /// Parse a configuration document.
    pub fn from_toml_str(source: &str) -> Result<Self, CounterError> {
        toml::from_str(source).map_err(|e| CounterError::Config(e.to_string()))
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CounterError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            CounterError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source)
    }

    /// Short backend name, as written in the `backend` field.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Volatile => "volatile",
            Self::Filesystem { .. } => "filesystem",
            Self::Redis { .. } => "redis",
        }
    }
}
