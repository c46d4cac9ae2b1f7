//! Redis backed stores.
//!
//! [`RedisCache<Connection>`] talks to a single node, [`RedisCache<ClusterConnection>`]
//! to a Redis Cluster. Both use `SET NX` for `add` and `INCR` for `increment`,
//! so tag registry updates are atomic.

mod config;

pub use config::RedisConfig;

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use cache::{Store, StoreError};
use redis::{Client, Connection, ConnectionLike, cluster::ClusterClient, cluster::ClusterConnection};

pub struct RedisCache<C = Connection> {
    conn: Mutex<C>,
    key_prefix: String,
    // MGET across hash slots is refused by a cluster
    batched: bool,
}

impl RedisCache<Connection> {
    pub fn open(config: &RedisConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.url.as_str()).map_err(StoreError::backend)?;
        let conn = client.get_connection().map_err(StoreError::backend)?;

        Ok(Self::with_connection(conn, &config.key_prefix, true))
    }
}

impl RedisCache<ClusterConnection> {
    /// Connects to `config.cluster_nodes`, or to `config.url` alone when no
    /// node is listed.
    pub fn open_cluster(config: &RedisConfig) -> Result<Self, StoreError> {
        let nodes = if config.cluster_nodes.is_empty() {
            vec![config.url.clone()]
        } else {
            config.cluster_nodes.clone()
        };

        let client = ClusterClient::new(nodes).map_err(StoreError::backend)?;
        let conn = client.get_connection().map_err(StoreError::backend)?;

        Ok(Self::with_connection(conn, &config.key_prefix, false))
    }
}

impl<C> RedisCache<C>
where
    C: ConnectionLike,
{
    pub fn with_connection(conn: C, key_prefix: &str, batched: bool) -> Self {
        Self {
            conn: Mutex::new(conn),
            key_prefix: key_prefix.to_string(),
            batched,
        }
    }

    #[inline]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn key(&self, key: &str) -> String {
        config::prefixed(&self.key_prefix, key)
    }

    fn conn(&self) -> MutexGuard<'_, C> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_cmd(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> redis::Cmd {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(key)).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg((ttl.as_millis() as u64).max(1));
        }
        cmd
    }
}

impl<C> std::fmt::Debug for RedisCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("key_prefix", &self.key_prefix)
            .field("batched", &self.batched)
            .finish_non_exhaustive()
    }
}

impl<C> Store for RedisCache<C>
where
    C: ConnectionLike,
{
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self), fields(cache.operation = "GET"))
    )]
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        redis::cmd("GET")
            .arg(self.key(key))
            .query(&mut *self.conn())
            .map_err(StoreError::backend)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, value), fields(cache.operation = "SET"))
    )]
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
        self.set_cmd(key, value, ttl)
            .query::<()>(&mut *self.conn())
            .map_err(StoreError::backend)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self, value), fields(cache.operation = "SETNX"), ret)
    )]
    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<bool, StoreError> {
        self.set_cmd(key, value, ttl)
            .arg("NX")
            .query::<Option<String>>(&mut *self.conn())
            .map(|reply| reply.is_some())
            .map_err(StoreError::backend)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self), fields(cache.operation = "DEL"), ret)
    )]
    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        redis::cmd("DEL")
            .arg(self.key(key))
            .query::<i64>(&mut *self.conn())
            .map(|deleted| deleted > 0)
            .map_err(StoreError::backend)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self), fields(cache.operation = "INCR"), ret)
    )]
    fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let not_an_integer = || StoreError::NotAnInteger(key.to_string());

        let value = redis::cmd("INCR")
            .arg(self.key(key))
            .query::<i64>(&mut *self.conn())
            .map_err(|e| {
                if e.detail().is_some_and(|detail| detail.contains("not an integer")) {
                    not_an_integer()
                } else {
                    StoreError::backend(e)
                }
            })?;

        u64::try_from(value).map_err(|_| not_an_integer())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self), fields(cache.operation = "EXISTS"))
    )]
    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        redis::cmd("EXISTS")
            .arg(self.key(key))
            .query::<i64>(&mut *self.conn())
            .map(|count| count > 0)
            .map_err(StoreError::backend)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip(self), fields(cache.operation = "MGET"))
    )]
    fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let values = if self.batched {
            let mut cmd = redis::cmd("MGET");
            for key in keys {
                cmd.arg(self.key(key));
            }
            cmd.query::<Vec<Option<Vec<u8>>>>(&mut *self.conn())
                .map_err(StoreError::backend)?
        } else {
            let mut conn = self.conn();
            keys.iter()
                .map(|key| redis::cmd("GET").arg(self.key(key)).query(&mut *conn))
                .collect::<Result<Vec<Option<Vec<u8>>>, _>>()
                .map_err(StoreError::backend)?
        };

        Ok(keys
            .iter()
            .zip(values)
            .filter_map(|(key, value)| value.map(|value| (key.to_string(), value)))
            .collect())
    }
}
