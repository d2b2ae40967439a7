//! # Core Type Definitions
//!
//! This module contains the types shared by every counter backend:
//! - Counter values (`CounterValue`)
//! - Counter addressing (`CounterFamily`, `CounterKey`)
//! - Batch updates (`FamilyUpdate`)
//! - Error types (`CounterError`)
//!
//! ## Precision
//!
//! Counter values are arbitrary-precision non-negative integers. They are
//! never narrowed to a machine word, and every backend stores them as
//! decimal text.

use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// COUNTER VALUE
// =============================================================================

/// A non-negative counter value of unbounded size.
///
/// Negative numbers are unrepresentable. The fallible conversions
/// (`TryFrom<i64>`, `TryFrom<BigInt>`, `FromStr`) reject them with
/// `CounterError::InvalidArgument`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CounterValue(BigUint);

impl CounterValue {
    /// The value of an unset counter.
    #[must_use]
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Wrap an existing big integer.
    #[must_use]
    pub fn new(value: BigUint) -> Self {
        Self(value)
    }

    /// Whether this is the unset value.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Return the successor of this value.
    #[must_use]
    pub fn increment(&self) -> Self {
        Self(&self.0 + 1u32)
    }

    /// Number of decimal digits needed to write this value.
    #[must_use]
    pub fn decimal_len(&self) -> usize {
        self.0.to_str_radix(10).len()
    }

    /// Narrow to `u64` when the value fits.
    #[must_use]
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }
}

impl fmt::Display for CounterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CounterValue {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u32> for CounterValue {
    fn from(value: u32) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for CounterValue {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for CounterValue {
    type Error = CounterError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self::from)
            .map_err(|_| CounterError::negative_value(value))
    }
}

impl TryFrom<BigInt> for CounterValue {
    type Error = CounterError;

    fn try_from(value: BigInt) -> Result<Self, Self::Error> {
        match value.to_biguint() {
            Some(unsigned) => Ok(Self(unsigned)),
            None => Err(CounterError::negative_value(value)),
        }
    }
}

impl FromStr for CounterValue {
    type Err = CounterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('-') {
            return Err(CounterError::negative_value(trimmed));
        }
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CounterError::InvalidArgument(format!(
                "not a decimal counter value: {:?}",
                s
            )));
        }
        BigUint::from_str(trimmed)
            .map(Self)
            .map_err(|e| CounterError::InvalidArgument(e.to_string()))
    }
}

// =============================================================================
// COUNTER ADDRESSING
// =============================================================================

/// A family of counters sharing one storage location.
///
/// A family is an entity kind, optionally qualified by a provenance kind
/// (snapshot counters indexed by entity identifier), optionally redirected
/// to a supplier prefix (numbering authority). Empty qualifiers are
/// normalized to `None`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CounterFamily {
    entity_kind: String,
    prov_kind: Option<String>,
    supplier_prefix: Option<String>,
}

fn non_empty(s: impl Into<String>) -> Option<String> {
    let s = s.into();
    if s.is_empty() { None } else { Some(s) }
}

impl CounterFamily {
    /// The entity counters of `entity_kind`.
    #[must_use]
    pub fn entity(entity_kind: impl Into<String>) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            prov_kind: None,
            supplier_prefix: None,
        }
    }

    /// The provenance counters of `entity_kind`, one per entity instance.
    #[must_use]
    pub fn provenance(entity_kind: impl Into<String>, prov_kind: impl Into<String>) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            prov_kind: non_empty(prov_kind),
            supplier_prefix: None,
        }
    }

    /// Redirect this family to another numbering authority.
    #[must_use]
    pub fn with_supplier_prefix(mut self, supplier_prefix: impl Into<String>) -> Self {
        self.supplier_prefix = non_empty(supplier_prefix);
        self
    }

    #[must_use]
    pub fn entity_kind(&self) -> &str {
        &self.entity_kind
    }

    #[must_use]
    pub fn prov_kind(&self) -> Option<&str> {
        self.prov_kind.as_deref()
    }

    #[must_use]
    pub fn supplier_prefix(&self) -> Option<&str> {
        self.supplier_prefix.as_deref()
    }

    #[must_use]
    pub fn is_provenance(&self) -> bool {
        self.prov_kind.is_some()
    }

    /// Address a single counter of this family.
    #[must_use]
    pub fn key(&self, identifier: u64) -> CounterKey {
        CounterKey {
            family: self.clone(),
            identifier,
        }
    }
}

/// The address of one counter: a family plus a 1-based identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CounterKey {
    family: CounterFamily,
    identifier: u64,
}

impl CounterKey {
    /// Entity counter of `entity_kind` with identifier 1.
    #[must_use]
    pub fn entity(entity_kind: impl Into<String>) -> Self {
        CounterFamily::entity(entity_kind).key(1)
    }

    /// Provenance counter for the entity `identifier` of `entity_kind`.
    #[must_use]
    pub fn provenance(
        entity_kind: impl Into<String>,
        prov_kind: impl Into<String>,
        identifier: u64,
    ) -> Self {
        CounterFamily::provenance(entity_kind, prov_kind).key(identifier)
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: u64) -> Self {
        self.identifier = identifier;
        self
    }

    #[must_use]
    pub fn with_supplier_prefix(mut self, supplier_prefix: impl Into<String>) -> Self {
        self.family = self.family.with_supplier_prefix(supplier_prefix);
        self
    }

    #[must_use]
    pub fn family(&self) -> &CounterFamily {
        &self.family
    }

    #[must_use]
    pub fn identifier(&self) -> u64 {
        self.identifier
    }

    #[must_use]
    pub fn entity_kind(&self) -> &str {
        self.family.entity_kind()
    }

    #[must_use]
    pub fn prov_kind(&self) -> Option<&str> {
        self.family.prov_kind()
    }

    #[must_use]
    pub fn supplier_prefix(&self) -> Option<&str> {
        self.family.supplier_prefix()
    }
}

// =============================================================================
// BATCH UPDATES
// =============================================================================

/// New values for several identifiers of one family.
///
/// Identifiers are kept in a `BTreeMap`, so a repeated identifier keeps
/// only its last value and updates are applied in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyUpdate {
    pub family: CounterFamily,
    pub values: BTreeMap<u64, CounterValue>,
}

impl FamilyUpdate {
    #[must_use]
    pub fn new(family: CounterFamily) -> Self {
        Self {
            family,
            values: BTreeMap::new(),
        }
    }

    /// Builder form of `insert`.
    #[must_use]
    pub fn with(mut self, identifier: u64, value: impl Into<CounterValue>) -> Self {
        self.insert(identifier, value);
        self
    }

    pub fn insert(&mut self, identifier: u64, value: impl Into<CounterValue>) {
        self.values.insert(identifier, value.into());
    }

    /// Highest identifier touched by this update, if any.
    #[must_use]
    pub fn max_identifier(&self) -> Option<u64> {
        self.values.keys().next_back().copied()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in a counter store.
///
/// - Absent data is not an error: unset counters read as zero
/// - Malformed stored data is `Corrupted`, never silently reset
/// - Nothing is retried internally
#[derive(Debug, Error)]
pub enum CounterError {
    /// A caller-supplied argument is out of range or not recognized.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored counter data is malformed.
    #[error("Corrupted counter data at {location}: {reason}")]
    Corrupted { location: String, reason: String },

    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The external counter service reported a failure.
    #[error("Counter service error: {0}")]
    Service(String),

    /// The store configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CounterError {
    fn negative_value(value: impl fmt::Display) -> Self {
        Self::InvalidArgument(format!("counter value must be non-negative, got {}", value))
    }
}

// =============================================================================
// TESTS
// =============================================================================
