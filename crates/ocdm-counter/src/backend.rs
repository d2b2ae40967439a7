//! # Backend Selection
//!
//! `CounterBackend` picks one of the counter stores at runtime, usually
//! from a `CounterConfig`, and forwards the contract to it.
//!
//! - `Volatile`: `VolatileCounterStore` (fast, lost on exit)
//! - `Filesystem`: `FileCounterStore` (durable, single writer)
//! - `Networked`: `RedisCounterStore` (durable, atomic increment across
//!   processes; requires the `redis` feature)

use crate::config::CounterConfig;
use crate::memory::VolatileCounterStore;
use crate::storage::FileCounterStore;
#[cfg(feature = "redis")]
use crate::storage::RedisCounterStore;
use crate::store::CounterStore;
use crate::{CounterError, CounterKey, CounterValue, FamilyUpdate};
use tracing::debug;

/// One of the available counter stores.
#[derive(Debug)]
pub enum CounterBackend {
    Volatile(VolatileCounterStore),
    Filesystem(FileCounterStore),
    #[cfg(feature = "redis")]
    Networked(RedisCounterStore),
}

impl Default for CounterBackend {
    fn default() -> Self {
        Self::Volatile(VolatileCounterStore::new())
    }
}

impl CounterBackend {
    /// Open the backend described by `config`.
    ///
    /// Filesystem stores touch nothing on disk until first use; Redis
    /// stores connect immediately.
    pub fn open(config: &CounterConfig) -> Result<Self, CounterError> {
        debug!(backend = config.backend_name(), "opening counter store");
        match config {
            CounterConfig::Volatile => Ok(Self::Volatile(VolatileCounterStore::new())),
            CounterConfig::Filesystem {
                info_dir,
                supplier_prefix,
            } => Ok(Self::Filesystem(FileCounterStore::new(
                info_dir.clone(),
                supplier_prefix.clone(),
            ))),
            #[cfg(feature = "redis")]
            CounterConfig::Redis {
                url,
                supplier_prefix,
            } => Ok(Self::Networked(RedisCounterStore::connect(
                url,
                supplier_prefix.clone(),
            )?)),
            #[cfg(not(feature = "redis"))]
            CounterConfig::Redis { .. } => Err(CounterError::Config(
                "redis backend requested but the `redis` feature is disabled".to_string(),
            )),
        }
    }

    /// Check if counters survive the process.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Volatile(_))
    }

    fn inner(&mut self) -> &mut dyn CounterStore {
        match self {
            Self::Volatile(store) => store,
            Self::Filesystem(store) => store,
            #[cfg(feature = "redis")]
            Self::Networked(store) => store,
        }
    }
}

impl CounterStore for CounterBackend {
    fn set(&mut self, value: &CounterValue, key: &CounterKey) -> Result<(), CounterError> {
        self.inner().set(value, key)
    }

    fn read(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError> {
        self.inner().read(key)
    }

    fn increment(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError> {
        self.inner().increment(key)
    }

    fn set_metadata(
        &mut self,
        value: &CounterValue,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<(), CounterError> {
        self.inner()
            .set_metadata(value, entity_kind, collection_name)
    }

    fn read_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError> {
        self.inner().read_metadata(entity_kind, collection_name)
    }

    fn increment_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError> {
        self.inner().increment_metadata(entity_kind, collection_name)
    }

    fn batch_update(&mut self, updates: &[FamilyUpdate]) -> Result<(), CounterError> {
        self.inner().batch_update(updates)
    }
}
