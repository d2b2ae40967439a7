//! # ocdm-counter
//!
//! The counter store behind OCDM identifier minting.
//!
//! Every entity (`br/0601`), every provenance snapshot of an entity
//! (`br/0601/prov/se/3`) and every dataset metadata record gets its
//! number from a counter kept here. Counters are non-negative integers of
//! unbounded size.
//!
//! ## Backends
//!
//! All backends implement `CounterStore`:
//! - `VolatileCounterStore`: in memory, for tests and dry runs
//! - `FileCounterStore`: fixed-width decimal records on disk
//! - `NetworkedCounterStore`: an external atomic key-value service
//!   (`RedisCounterStore` with the `redis` feature)
//!
//! `CounterBackend` selects one at runtime from a `CounterConfig`.
//!
//! ## Architectural Constraints
//!
//! - Synchronous: every call blocks until its I/O completes
//! - No internal locking: the filesystem backend assumes a single writer
//! - Reading an unset counter yields zero, never an error

// =============================================================================
// MODULES
// =============================================================================

pub mod backend;
pub mod config;
pub mod formats;
pub mod memory;
pub mod storage;
pub mod store;
pub mod types;
pub mod vocabulary;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{CounterError, CounterFamily, CounterKey, CounterValue, FamilyUpdate};

// =============================================================================
// RE-EXPORTS: Stores
// =============================================================================

pub use backend::CounterBackend;
pub use config::CounterConfig;
pub use memory::VolatileCounterStore;
pub use storage::{AtomicKv, FileCounterStore, NetworkedCounterStore};
#[cfg(feature = "redis")]
pub use storage::{RedisCounterStore, RedisKv};
pub use store::CounterStore;
