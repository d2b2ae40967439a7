//! # Redis Service Handle
//!
//! `AtomicKv` over a synchronous Redis connection. `INCR` is the atomic
//! increment; it is limited to signed 64-bit values, larger counters can
//! be set and read but not incremented.

use crate::storage::networked::{AtomicKv, NetworkedCounterStore};
use crate::CounterError;
use redis::{Client, Connection, RedisError};

fn service_error(e: RedisError) -> CounterError {
    CounterError::Service(e.to_string())
}

/// A blocking connection to a Redis-compatible server.
pub struct RedisKv {
    connection: Connection,
}

impl std::fmt::Debug for RedisKv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisKv").finish_non_exhaustive()
    }
}

impl RedisKv {
    /// Connect to `url`, e.g. `redis://127.0.0.1:6379/0`.
    pub fn connect(url: &str) -> Result<Self, CounterError> {
        let client = Client::open(url).map_err(service_error)?;
        let connection = client.get_connection().map_err(service_error)?;
        Ok(Self { connection })
    }
}

impl AtomicKv for RedisKv {
    fn get(&mut self, key: &str) -> Result<Option<String>, CounterError> {
        redis::cmd("GET")
            .arg(key)
            .query(&mut self.connection)
            .map_err(service_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CounterError> {
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query(&mut self.connection)
            .map_err(service_error)
    }

    fn incr(&mut self, key: &str) -> Result<i64, CounterError> {
        redis::cmd("INCR")
            .arg(key)
            .query(&mut self.connection)
            .map_err(service_error)
    }

    /// One pipelined round trip, without MULTI/EXEC.
    fn set_many(&mut self, entries: &[(String, String)]) -> Result<(), CounterError> {
        let mut pipe = redis::pipe();
        for (key, value) in entries {
            pipe.cmd("SET").arg(key).arg(value).ignore();
        }
        pipe.query(&mut self.connection).map_err(service_error)
    }
}

/// The networked store as deployed: counters in Redis.
pub type RedisCounterStore = NetworkedCounterStore<RedisKv>;

impl RedisCounterStore {
    /// Connect to `url` and use `supplier_prefix` for unprefixed keys.
    pub fn connect(url: &str, supplier_prefix: impl Into<String>) -> Result<Self, CounterError> {
        Ok(Self::new(RedisKv::connect(url)?, supplier_prefix))
    }
}
