use std::{collections::HashMap, fmt::Display};

use crate::{Store, TagError, TagId};

/// Current stamp of a tag.
///
/// Only ever compared for equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Stamp(String);

impl Stamp {
    pub const BASE: &'static str = "0";

    pub fn base() -> Self {
        Self(Self::BASE.to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Stamp {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Display for Stamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-tag stamps kept as ordinary entries of the backing store, under
/// `<namespace>:<tag id>`.
pub struct TagRegistry<'s, S: ?Sized> {
    store: &'s S,
    namespace: &'s str,
}

impl<'s, S> TagRegistry<'s, S>
where
    S: Store + ?Sized,
{
    pub fn new(store: &'s S, namespace: &'s str) -> Self {
        Self { store, namespace }
    }

    pub fn key(&self, id: &TagId) -> String {
        format!("{}:{}", self.namespace, id)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", fields(%id), skip_all, ret)
    )]
    pub fn current_stamp(&self, id: &TagId) -> Result<Option<Stamp>, TagError> {
        let key = self.key(id);
        self.store
            .get(&key)?
            .map(|bytes| decode(key, bytes))
            .transpose()
    }

    /// Looks up several stamps in one round trip. Ids without a stored stamp
    /// are left out of the result.
    ///
    /// Every tagged write stores the stamps it captures, so a stamp missing
    /// here was lost, to eviction for instance, and any capture of it must
    /// be treated as stale.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn current_stamps<'i, I>(&self, ids: I) -> Result<HashMap<TagId, Stamp>, TagError>
    where
        I: IntoIterator<Item = &'i TagId>,
    {
        let keyed = ids
            .into_iter()
            .map(|id| (self.key(id), id))
            .collect::<HashMap<_, _>>();
        if keyed.is_empty() {
            return Ok(HashMap::new());
        }

        let keys = keyed.keys().map(String::as_str).collect::<Vec<_>>();
        let mut found = self.store.get_multi(&keys)?;

        keyed
            .into_iter()
            .filter_map(|(key, id)| {
                let bytes = found.remove(&key)?;
                Some(decode(key, bytes).map(|stamp| (id.clone(), stamp)))
            })
            .collect()
    }

    /// Returns the stored stamp, storing the base stamp first if there is none.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", fields(%id), skip_all, ret)
    )]
    pub fn ensure_stamp(&self, id: &TagId) -> Result<Stamp, TagError> {
        let key = self.key(id);
        if self.store.add(&key, Stamp::BASE.as_bytes(), None)? {
            return Ok(Stamp::base());
        }

        match self.store.get(&key)? {
            Some(bytes) => decode(key, bytes),
            // lost to a concurrent delete of the stamp entry
            None => Ok(Stamp::base()),
        }
    }

    /// Moves the slot to a new generation, invalidating every capture of the
    /// previous one.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%id), skip_all, ret)
    )]
    pub fn advance(&self, id: &TagId) -> Result<Stamp, TagError> {
        let generation = self.store.increment(&self.key(id))?;
        Ok(Stamp(generation.to_string()))
    }

    /// Pins the stamp of `id` to `version`, overwriting the stored one.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", fields(%id, %version), skip_all)
    )]
    pub fn set_exact(&self, id: &TagId, version: &str) -> Result<(), TagError> {
        self.store
            .set(&self.key(id), version.as_bytes(), None)
            .map_err(TagError::from)
    }
}

fn decode(key: String, bytes: Vec<u8>) -> Result<Stamp, TagError> {
    String::from_utf8(bytes)
        .map(Stamp)
        .map_err(|_| TagError::InvalidStamp(key))
}
