use std::{
    collections::{BTreeSet, HashMap},
    time::Duration,
};

use serde::{Serialize, de::DeserializeOwned, de::IgnoredAny};

use crate::{
    Config, Stamp, Store, TagError, TagId, TagRef, TagRegistry,
    cfg_debug::CfgDebug,
    envelope::{Captured, Envelope},
};

/// Key-value cache whose entries can be invalidated by tag.
///
/// Every entry is stored together with the stamps its tags had when it was
/// written. A read compares them with the registry and reports a miss when
/// any of them moved on.
pub struct TaggedCache<S> {
    store: S,
    config: Config,
}

impl<S> TaggedCache<S>
where
    S: Store,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, Config::default())
    }

    pub fn with_config(store: S, config: Config) -> Self {
        Self { store, config }
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> TagRegistry<'_, S> {
        TagRegistry::new(&self.store, &self.config.namespace)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%key, ?value, ?ttl), skip_all)
    )]
    pub fn write<V>(
        &self,
        key: &str,
        value: &V,
        tags: impl Into<TagRef>,
        ttl: Option<Duration>,
    ) -> Result<(), TagError>
    where
        V: Serialize + CfgDebug + ?Sized,
    {
        let tags = self.capture(&tags.into())?;
        let bytes = serde_json::to_vec(&Envelope { value, tags })?;
        self.store.set(key, &bytes, ttl)?;
        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%key), skip_all)
    )]
    pub fn read<V>(&self, key: &str) -> Result<Option<V>, TagError>
    where
        V: DeserializeOwned,
    {
        let Some(bytes) = self.store.get(key)? else {
            #[cfg(feature = "tracing")]
            tracing::debug!("key not found");

            return Ok(None);
        };

        let envelope = serde_json::from_slice::<Envelope<V>>(&bytes)?;
        let current = self
            .registry()
            .current_stamps(envelope.tags.iter().map(|captured| &captured.id))?;

        Ok(self.unseal(key, envelope, &current))
    }

    /// Same as [`TaggedCache::read`] without decoding the value.
    pub fn exists(&self, key: &str) -> Result<bool, TagError> {
        self.read::<IgnoredAny>(key).map(|value| value.is_some())
    }

    /// Reads a batch of keys. Every key of `keys` is present in the result,
    /// mapped to `None` when missing or stale.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(?keys), skip_all)
    )]
    pub fn read_multi<V>(&self, keys: &[&str]) -> Result<HashMap<String, Option<V>>, TagError>
    where
        V: DeserializeOwned,
    {
        let found = self.store.get_multi(keys)?;

        let mut envelopes = HashMap::with_capacity(found.len());
        for (key, bytes) in found {
            let envelope = serde_json::from_slice::<Envelope<V>>(&bytes)?;
            envelopes.insert(key, envelope);
        }

        let current = self.registry().current_stamps(
            envelopes
                .values()
                .flat_map(|envelope| envelope.tags.iter())
                .map(|captured| &captured.id)
                .collect::<BTreeSet<_>>(),
        )?;

        let mut values = keys
            .iter()
            .map(|key| (key.to_string(), None))
            .collect::<HashMap<_, _>>();
        for (key, envelope) in envelopes {
            let value = self.unseal(&key, envelope, &current);
            values.insert(key, value);
        }

        Ok(values)
    }

    /// Reads `key`, or produces, writes and returns a value on a miss.
    /// Without `tags` the produced value is written untagged.
    pub fn fetch<V, F>(
        &self,
        key: &str,
        tags: Option<TagRef>,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<V, TagError>
    where
        V: Serialize + DeserializeOwned + CfgDebug,
        F: FnOnce() -> V,
    {
        self.try_fetch(key, tags, ttl, || Ok::<_, TagError>(producer()))
    }

    /// [`TaggedCache::fetch`] with a fallible producer. Nothing is written
    /// when the producer fails.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%key, ?tags), skip_all)
    )]
    pub fn try_fetch<V, E, F>(
        &self,
        key: &str,
        tags: Option<TagRef>,
        ttl: Option<Duration>,
        producer: F,
    ) -> Result<V, E>
    where
        V: Serialize + DeserializeOwned + CfgDebug,
        E: From<TagError>,
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.read(key)? {
            return Ok(value);
        }

        let value = producer()?;
        self.write(key, &value, tags.unwrap_or_else(TagRef::none), ttl)?;
        Ok(value)
    }

    /// Invalidates every entry written with `tags`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all)
    )]
    pub fn delete_tag(&self, tags: impl Into<TagRef>) -> Result<(), TagError> {
        let registry = self.registry();
        let tags = tags.into();

        #[cfg(feature = "tracing")]
        tracing::debug!(?tags, "deleting tags");

        for slot in tags.slots() {
            registry.advance(&slot)?;
        }

        Ok(())
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%key), skip_all, ret)
    )]
    pub fn delete(&self, key: &str) -> Result<bool, TagError> {
        self.store.delete(key).map_err(TagError::from)
    }

    fn capture(&self, tags: &TagRef) -> Result<Vec<Captured>, TagError> {
        let registry = self.registry();
        tags.slots()
            .into_iter()
            .map(|slot| {
                let stamp = registry.ensure_stamp(&slot)?;
                Ok::<_, TagError>(Captured::new(slot, stamp))
            })
            .collect()
    }

    fn unseal<V>(
        &self,
        key: &str,
        envelope: Envelope<V>,
        current: &HashMap<TagId, Stamp>,
    ) -> Option<V> {
        // a slot without a stamp lost its history, so it matches nothing
        let stale = envelope.tags.iter().find(|captured| {
            current
                .get(&captured.id)
                .is_none_or(|stamp| !captured.is_valid(stamp))
        });

        match stale {
            None => Some(envelope.value),
            Some(_captured) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(%key, tag = %_captured.id, "tag miss");

                self.discard(key);
                None
            }
        }
    }

    fn discard(&self, key: &str) {
        if !self.config.delete_stale {
            return;
        }

        let _ = self.store.delete(key).inspect_err(|_err| {
            #[cfg(feature = "tracing")]
            tracing::warn!(%key, error = %_err, "failed to delete stale entry");
        });
    }
}
