//! # Storage Backends
//!
//! Persistent counter stores:
//! - `FileCounterStore`: fixed-width record files on local disk
//! - `NetworkedCounterStore`: an external atomic key-value service,
//!   with `RedisKv` as the concrete service when the `redis` feature is on

mod file_store;
mod networked;
#[cfg(feature = "redis")]
mod redis_kv;

pub use file_store::FileCounterStore;
pub use networked::{AtomicKv, NetworkedCounterStore};
#[cfg(feature = "redis")]
pub use redis_kv::{RedisCounterStore, RedisKv};
