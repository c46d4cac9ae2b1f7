use std::{
    collections::HashMap,
    thread::{self, ThreadId},
    time::Duration,
};

use dashmap::DashMap;

use crate::{Config, Store, StoreError};

type Memo = HashMap<String, Option<Vec<u8>>>;

/// Store decorator memoizing reads for the length of an explicit scope.
///
/// Inside [`LocalCache::with_local_cache`] every `get` made by the calling
/// thread is remembered, hits and misses alike. Any mutation going through
/// the decorator clears the memo of every open scope. Tag registry keys are
/// never memoized, so a tag deleted by another process is still observed
/// within a scope.
pub struct LocalCache<S> {
    inner: S,
    scopes: DashMap<ThreadId, Memo>,
    config: Config,
}

impl<S> LocalCache<S>
where
    S: Store,
{
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, &Config::default())
    }

    /// `config` must be the one given to the [`crate::TaggedCache`] on top.
    pub fn with_config(inner: S, config: &Config) -> Self {
        Self {
            inner,
            scopes: DashMap::new(),
            config: config.clone(),
        }
    }

    #[inline]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Runs `f` with read memoization enabled for the current thread.
    /// Nested calls join the outer scope.
    pub fn with_local_cache<R>(&self, f: impl FnOnce() -> R) -> R {
        let id = thread::current().id();
        if self.scopes.contains_key(&id) {
            return f();
        }

        self.scopes.insert(id, Memo::new());
        let _scope = Scope {
            scopes: &self.scopes,
            id,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(?id, "local cache scope opened");

        f()
    }

    fn recall(&self, key: &str) -> Option<Option<Vec<u8>>> {
        if self.config.is_registry_key(key) {
            return None;
        }

        self.scopes
            .get(&thread::current().id())?
            .get(key)
            .cloned()
    }

    fn remember(&self, key: &str, value: Option<&Vec<u8>>) {
        if self.config.is_registry_key(key) {
            return;
        }

        if let Some(mut memo) = self.scopes.get_mut(&thread::current().id()) {
            memo.insert(key.to_string(), value.cloned());
        }
    }

    fn forget_all(&self) {
        for mut memo in self.scopes.iter_mut() {
            memo.value_mut().clear();
        }
    }
}

impl<S> Store for LocalCache<S>
where
    S: Store,
{
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(value) = self.recall(key) {
            #[cfg(feature = "tracing")]
            tracing::trace!(%key, "local cache hit");

            return Ok(value);
        }

        let value = self.inner.get(key)?;
        self.remember(key, value.as_ref());
        Ok(value)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
        let result = self.inner.set(key, value, ttl);
        self.forget_all();
        result
    }

    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<bool, StoreError> {
        let result = self.inner.add(key, value, ttl);
        self.forget_all();
        result
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = self.inner.delete(key);
        self.forget_all();
        result
    }

    fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let result = self.inner.increment(key);
        self.forget_all();
        result
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.get(key).map(|value| value.is_some())
    }

    fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        let mut found = HashMap::with_capacity(keys.len());
        let mut missing = Vec::new();

        for key in keys {
            match self.recall(key) {
                Some(Some(value)) => {
                    found.insert(key.to_string(), value);
                }
                Some(None) => {}
                None => missing.push(*key),
            }
        }

        if !missing.is_empty() {
            let fetched = self.inner.get_multi(&missing)?;
            for key in missing {
                let value = fetched.get(key).cloned();
                self.remember(key, value.as_ref());
                if let Some(value) = value {
                    found.insert(key.to_string(), value);
                }
            }
        }

        Ok(found)
    }
}

struct Scope<'a> {
    scopes: &'a DashMap<ThreadId, Memo>,
    id: ThreadId,
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.scopes.remove(&self.id);

        #[cfg(feature = "tracing")]
        tracing::debug!(id = ?self.id, "local cache scope closed");
    }
}
