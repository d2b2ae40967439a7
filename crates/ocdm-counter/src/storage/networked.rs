//! # Networked Counter Storage
//!
//! Counters kept in an external key-value service that offers an atomic
//! increment-and-return command. The service provides durability and
//! single-key atomicity across processes; this store only maps counter
//! addresses to string keys and validates arguments locally.
//!
//! ## Key format
//!
//! ```text
//! <entity_kind>:<supplier_prefix>                          entity
//! <entity_kind>:<supplier_prefix>:<identifier>:<prov_kind> provenance
//! metadata:<collection_name>:<entity_kind>                 metadata
//! ```
//!
//! Empty segments are omitted. Values are stored as decimal text.
//!
//! There is no local cache: every call is at least one round trip.

use crate::store::CounterStore;
use crate::vocabulary;
use crate::{CounterError, CounterKey, CounterValue, FamilyUpdate};
use tracing::trace;

// =============================================================================
// ATOMIC KEY-VALUE SEAM
// =============================================================================

/// The minimal command set the networked store needs from a service.
pub trait AtomicKv {
    /// Fetch the text stored under `key`.
    fn get(&mut self, key: &str) -> Result<Option<String>, CounterError>;

    /// Unconditionally overwrite `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<(), CounterError>;

    /// Atomically add one to the integer under `key` (absent counts as
    /// zero) and return the result.
    fn incr(&mut self, key: &str) -> Result<i64, CounterError>;

    /// Overwrite several keys. Not atomic.
    fn set_many(&mut self, entries: &[(String, String)]) -> Result<(), CounterError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

// =============================================================================
// NETWORKED COUNTER STORE
// =============================================================================

/// A counter store over any `AtomicKv` service.
///
/// Only structure is validated (identifier, collection name, non-empty
/// entity and metadata kinds); short names outside the local vocabulary
/// are accepted.
#[derive(Debug)]
pub struct NetworkedCounterStore<K> {
    kv: K,
    /// Prefix used when a key carries none.
    supplier_prefix: String,
}

impl<K: AtomicKv> NetworkedCounterStore<K> {
    pub fn new(kv: K, supplier_prefix: impl Into<String>) -> Self {
        Self {
            kv,
            supplier_prefix: supplier_prefix.into(),
        }
    }

    #[must_use]
    pub fn supplier_prefix(&self) -> &str {
        &self.supplier_prefix
    }

    /// Service key for an entity or provenance counter.
    #[must_use]
    pub fn counter_key(&self, key: &CounterKey) -> String {
        let prefix = key.supplier_prefix().unwrap_or(self.supplier_prefix.as_str());
        let mut service_key = key.entity_kind().to_string();
        if !prefix.is_empty() {
            service_key.push(':');
            service_key.push_str(prefix);
        }
        if let Some(prov_kind) = key.prov_kind() {
            service_key.push_str(&format!(":{}:{}", key.identifier(), prov_kind));
        }
        service_key
    }

    /// Service key for a metadata counter.
    #[must_use]
    pub fn metadata_key(entity_kind: &str, collection_name: &str) -> String {
        format!("metadata:{}:{}", collection_name, entity_kind)
    }

    fn fetch(&mut self, service_key: &str) -> Result<CounterValue, CounterError> {
        trace!(key = service_key, "reading counter");
        match self.kv.get(service_key)? {
            None => Ok(CounterValue::zero()),
            Some(text) => text.parse().map_err(|_| CounterError::Corrupted {
                location: service_key.to_string(),
                reason: format!("stored value is not a decimal counter: {:?}", text),
            }),
        }
    }

    fn store(&mut self, service_key: &str, value: &CounterValue) -> Result<(), CounterError> {
        trace!(key = service_key, %value, "writing counter");
        self.kv.set(service_key, &value.to_string())
    }

    fn bump(&mut self, service_key: &str) -> Result<CounterValue, CounterError> {
        trace!(key = service_key, "incrementing counter");
        let next = self.kv.incr(service_key)?;
        CounterValue::try_from(next).map_err(|_| CounterError::Corrupted {
            location: service_key.to_string(),
            reason: format!("service returned a negative counter: {}", next),
        })
    }
}

impl<K: AtomicKv> CounterStore for NetworkedCounterStore<K> {
    fn set(&mut self, value: &CounterValue, key: &CounterKey) -> Result<(), CounterError> {
        vocabulary::validate_key_structure(key)?;
        let service_key = self.counter_key(key);
        self.store(&service_key, value)
    }

    fn read(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError> {
        vocabulary::validate_key_structure(key)?;
        let service_key = self.counter_key(key);
        self.fetch(&service_key)
    }

    fn increment(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError> {
        vocabulary::validate_key_structure(key)?;
        let service_key = self.counter_key(key);
        self.bump(&service_key)
    }

    fn set_metadata(
        &mut self,
        value: &CounterValue,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<(), CounterError> {
        vocabulary::validate_metadata_structure(entity_kind, collection_name)?;
        self.store(&Self::metadata_key(entity_kind, collection_name), value)
    }

    fn read_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError> {
        vocabulary::validate_metadata_structure(entity_kind, collection_name)?;
        self.fetch(&Self::metadata_key(entity_kind, collection_name))
    }

    fn increment_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError> {
        vocabulary::validate_metadata_structure(entity_kind, collection_name)?;
        self.bump(&Self::metadata_key(entity_kind, collection_name))
    }

    /// All keys are validated first, then written with one `set_many`.
    fn batch_update(&mut self, updates: &[FamilyUpdate]) -> Result<(), CounterError> {
        let mut entries = Vec::new();
        for update in updates {
            for (&identifier, value) in &update.values {
                let key = update.family.key(identifier);
                vocabulary::validate_key_structure(&key)?;
                entries.push((self.counter_key(&key), value.to_string()));
            }
        }
        if entries.is_empty() {
            return Ok(());
        }
        trace!(keys = entries.len(), "writing counter batch");
        self.kv.set_many(&entries)
    }
}

// =============================================================================
// TESTS
// =============================================================================
