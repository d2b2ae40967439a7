//! # Vocabulary
//!
//! Fixed short-name vocabularies and record format constants.
//!
//! These are compiled into the binary and are immutable at runtime.
//! Backends that validate vocabulary (volatile and filesystem) call the
//! helpers below; the networked backend only checks structure.

use crate::{CounterError, CounterKey};

// =============================================================================
// SHORT NAMES
// =============================================================================

/// Recognized entity-kind short names.
///
/// - `an` annotation, `ar` agent role, `be` bibliographic entry,
///   `br` bibliographic resource, `ci` citation, `de` discourse element,
///   `id` identifier, `pl` pointer list, `ra` responsible agent,
///   `re` resource embodiment, `rp` reference pointer
pub const ENTITY_SHORT_NAMES: &[&str] = &[
    "an", "ar", "be", "br", "ci", "de", "id", "pl", "ra", "re", "rp",
];

/// Recognized provenance-kind short names (`se` snapshot of entity).
pub const PROV_SHORT_NAMES: &[&str] = &["se"];

/// Recognized metadata-kind short names (`di` dataset distribution).
pub const METADATA_SHORT_NAMES: &[&str] = &["di"];

// =============================================================================
// RECORD FORMAT
// =============================================================================

/// Padding byte between the digits of a record and its terminator.
pub const PAD_BYTE: u8 = b' ';

/// Record terminator.
pub const RECORD_TERMINATOR: u8 = b'\n';

/// Width of the blank record a new family file starts with.
///
/// Two digits plus the terminator.
pub const MIN_RECORD_WIDTH: usize = 3;

/// File name prefix for entity counter families.
pub const INFO_FILE_PREFIX: &str = "info_file_";

/// File name prefix for provenance counter families.
pub const PROV_FILE_PREFIX: &str = "prov_file_";

/// File name prefix for metadata counter families.
pub const METADATA_FILE_PREFIX: &str = "metadata_";

/// Subdirectory of the info directory holding per-dataset metadata.
pub const DATASETS_DIR: &str = "datasets";

// =============================================================================
// VALIDATION
// =============================================================================

/// Reject identifier 0. Identifiers are 1-based.
pub fn validate_identifier(identifier: u64) -> Result<(), CounterError> {
    if identifier == 0 {
        return Err(CounterError::InvalidArgument(
            "identifier must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Structural checks shared by every backend.
pub fn validate_key_structure(key: &CounterKey) -> Result<(), CounterError> {
    if key.entity_kind().is_empty() {
        return Err(CounterError::InvalidArgument(
            "entity kind must not be empty".to_string(),
        ));
    }
    validate_identifier(key.identifier())
}

/// Structural checks plus entity and provenance vocabulary.
pub fn validate_key(key: &CounterKey) -> Result<(), CounterError> {
    validate_key_structure(key)?;
    validate_entity_kind(key.entity_kind())?;
    if let Some(prov_kind) = key.prov_kind() {
        validate_prov_kind(prov_kind)?;
    }
    Ok(())
}

pub fn validate_entity_kind(entity_kind: &str) -> Result<(), CounterError> {
    if !ENTITY_SHORT_NAMES.contains(&entity_kind) {
        return Err(CounterError::InvalidArgument(format!(
            "unrecognized entity kind: {:?}",
            entity_kind
        )));
    }
    Ok(())
}

pub fn validate_prov_kind(prov_kind: &str) -> Result<(), CounterError> {
    if !PROV_SHORT_NAMES.contains(&prov_kind) {
        return Err(CounterError::InvalidArgument(format!(
            "unrecognized provenance kind: {:?}",
            prov_kind
        )));
    }
    Ok(())
}

/// A collection name is required for every metadata operation.
pub fn validate_collection_name(collection_name: &str) -> Result<(), CounterError> {
    if collection_name.is_empty() {
        return Err(CounterError::InvalidArgument(
            "collection name is required for metadata counters".to_string(),
        ));
    }
    Ok(())
}

/// Structural metadata checks shared by every backend.
pub fn validate_metadata_structure(
    entity_kind: &str,
    collection_name: &str,
) -> Result<(), CounterError> {
    validate_collection_name(collection_name)?;
    if entity_kind.is_empty() {
        return Err(CounterError::InvalidArgument(
            "metadata kind must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Structural metadata checks plus metadata vocabulary.
pub fn validate_metadata(entity_kind: &str, collection_name: &str) -> Result<(), CounterError> {
    validate_metadata_structure(entity_kind, collection_name)?;
    if !METADATA_SHORT_NAMES.contains(&entity_kind) {
        return Err(CounterError::InvalidArgument(format!(
            "unrecognized metadata kind: {:?}",
            entity_kind
        )));
    }
    Ok(())
}
