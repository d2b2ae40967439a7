//! # Volatile Counter Store
//!
//! A process-local counter store. Nothing is persisted; counters live as
//! long as the store value does.
//!
//! All maps are `BTreeMap` so iteration order (and `Debug` output) is
//! deterministic.

use crate::store::CounterStore;
use crate::vocabulary;
use crate::{CounterError, CounterKey, CounterValue};
use std::collections::BTreeMap;

/// In-memory implementation of `CounterStore`.
///
/// - One value per entity kind for plain entity counters (the identifier
///   is validated but does not select a slot)
/// - One growable sequence per (entity kind, provenance kind), indexed by
///   `identifier - 1`
/// - One map per collection for metadata counters
///
/// Supplier prefixes are ignored. Not synchronized: wrap it in a lock if it
/// must be shared between threads.
#[derive(Debug, Clone, Default)]
pub struct VolatileCounterStore {
    entity_counters: BTreeMap<String, CounterValue>,
    prov_counters: BTreeMap<(String, String), Vec<CounterValue>>,
    metadata_counters: BTreeMap<String, BTreeMap<String, CounterValue>>,
}

impl VolatileCounterStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate the slot for `key`, growing provenance sequences with zeros
    /// up to and including the requested index.
    fn slot(&mut self, key: &CounterKey) -> Result<&mut CounterValue, CounterError> {
        vocabulary::validate_key(key)?;
        let entity_kind = key.entity_kind().to_string();

        match key.prov_kind() {
            None => Ok(self.entity_counters.entry(entity_kind).or_default()),
            Some(prov_kind) => {
                let out_of_range = || {
                    CounterError::InvalidArgument(format!(
                        "identifier {} exceeds addressable range",
                        key.identifier()
                    ))
                };
                let index = usize::try_from(key.identifier() - 1).map_err(|_| out_of_range())?;
                let len = index.checked_add(1).ok_or_else(out_of_range)?;
                let sequence = self
                    .prov_counters
                    .entry((entity_kind, prov_kind.to_string()))
                    .or_default();
                if len > sequence.len() {
                    sequence
                        .try_reserve(len - sequence.len())
                        .map_err(|_| out_of_range())?;
                    sequence.resize(len, CounterValue::zero());
                }
                Ok(&mut sequence[index])
            }
        }
    }

    fn metadata_slot(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<&mut CounterValue, CounterError> {
        vocabulary::validate_metadata(entity_kind, collection_name)?;
        Ok(self
            .metadata_counters
            .entry(collection_name.to_string())
            .or_default()
            .entry(entity_kind.to_string())
            .or_default())
    }
}

impl CounterStore for VolatileCounterStore {
    fn set(&mut self, value: &CounterValue, key: &CounterKey) -> Result<(), CounterError> {
        *self.slot(key)? = value.clone();
        Ok(())
    }

    fn read(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError> {
        Ok(self.slot(key)?.clone())
    }

    fn increment(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError> {
        let slot = self.slot(key)?;
        *slot = slot.increment();
        Ok(slot.clone())
    }

    fn set_metadata(
        &mut self,
        value: &CounterValue,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<(), CounterError> {
        *self.metadata_slot(entity_kind, collection_name)? = value.clone();
        Ok(())
    }

    fn read_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError> {
        Ok(self.metadata_slot(entity_kind, collection_name)?.clone())
    }

    fn increment_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError> {
        let slot = self.metadata_slot(entity_kind, collection_name)?;
        *slot = slot.increment();
        Ok(slot.clone())
    }
}
