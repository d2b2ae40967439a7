//! # Counter Contract
//!
//! The `CounterStore` trait is the only surface consumers see. Every
//! backend (volatile, filesystem, networked) implements it.

use crate::{CounterError, CounterKey, CounterValue, FamilyUpdate};

/// The operations every counter backend provides.
///
/// Entity and provenance counters are addressed by `CounterKey`; metadata
/// counters by `(entity_kind, collection_name)`.
///
/// - Reading an unset counter returns zero, never an error
/// - `increment` returns the post-increment value
/// - Identifier 0 is rejected with `CounterError::InvalidArgument`
///
/// Methods take `&mut self` so that backends holding a connection or an
/// in-memory map can be used uniformly.
pub trait CounterStore {
    /// Overwrite a counter.
    fn set(&mut self, value: &CounterValue, key: &CounterKey) -> Result<(), CounterError>;

    /// Read a counter, zero if unset.
    fn read(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError>;

    /// Add one to a counter and return the new value.
    fn increment(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError>;

    /// Overwrite a metadata counter of `collection_name`.
    fn set_metadata(
        &mut self,
        value: &CounterValue,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<(), CounterError>;

    /// Read a metadata counter, zero if unset.
    fn read_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError>;

    /// Add one to a metadata counter and return the new value.
    fn increment_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError>;

    /// Apply several updates.
    ///
    /// The default applies each value with `set`. Backends override it
    /// to amortize work per family. Updates are never atomic across
    /// families.
    fn batch_update(&mut self, updates: &[FamilyUpdate]) -> Result<(), CounterError> {
        for update in updates {
            for (identifier, value) in &update.values {
                self.set(value, &update.family.key(*identifier))?;
            }
        }
        Ok(())
    }
}
