use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt::Display,
};

use serde::Serialize;
use time::OffsetDateTime;

use crate::{Tag, TagError, TagId};

/// Tags as supplied to a write or a tag deletion.
///
/// A plain reference follows the registry's generation counter for each id.
/// A versioned reference carries a caller-chosen version and invalidates by
/// exact match: deleting `{id: v}` reaches only entries written with that
/// same version. Versions are counted in slots separate from the plain slot
/// of `id`, so mixing both modes on one id is safe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagRef {
    Plain(Vec<TagId>),
    Versioned { id: TagId, version: String },
}

impl TagRef {
    /// No tags. Entries written with it are never invalidated by a tag.
    pub fn none() -> Self {
        Self::Plain(Vec::new())
    }

    pub fn plain<I>(tags: I) -> Self
    where
        I: IntoIterator,
        I::Item: Tag,
    {
        Self::Plain(tags.into_iter().map(|tag| TagId::new(&tag)).collect())
    }

    pub fn versioned(tag: &(impl Tag + ?Sized), version: impl Display) -> Self {
        Self::Versioned {
            id: TagId::new(tag),
            version: version.to_string(),
        }
    }

    /// Plain reference to serializable objects, identified by content.
    pub fn objects<'a, T, I>(objects: I) -> Result<Self, TagError>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        objects
            .into_iter()
            .map(TagId::of)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Plain)
            .map_err(TagError::from)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Plain(ids) if ids.is_empty())
    }

    /// Registry slots captured on write and advanced on delete, without
    /// duplicates.
    pub fn slots(&self) -> Vec<TagId> {
        match self {
            Self::Plain(ids) => ids
                .iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .cloned()
                .collect(),
            Self::Versioned { id, version } => vec![TagId::versioned(id, version)],
        }
    }

    fn from_map<K, V>(mut entries: impl ExactSizeIterator<Item = (K, V)>) -> Result<Self, TagError>
    where
        K: Tag,
        V: Display,
    {
        let len = entries.len();
        match (entries.next(), len) {
            (Some((tag, version)), 1) => Ok(Self::versioned(&tag, version)),
            _ => Err(TagError::InvalidTagRef(format!(
                "a versioned tag mapping needs exactly one entry, got {len}"
            ))),
        }
    }
}

impl From<&str> for TagRef {
    fn from(tag: &str) -> Self {
        Self::Plain(vec![TagId::new(tag)])
    }
}

impl From<String> for TagRef {
    fn from(tag: String) -> Self {
        Self::Plain(vec![TagId::new(&tag)])
    }
}

impl From<TagId> for TagRef {
    fn from(id: TagId) -> Self {
        Self::Plain(vec![id])
    }
}

impl From<OffsetDateTime> for TagRef {
    fn from(timestamp: OffsetDateTime) -> Self {
        Self::Plain(vec![TagId::new(&timestamp)])
    }
}

impl<T: Tag> From<Vec<T>> for TagRef {
    fn from(tags: Vec<T>) -> Self {
        Self::plain(tags)
    }
}

impl<T: Tag, const N: usize> From<[T; N]> for TagRef {
    fn from(tags: [T; N]) -> Self {
        Self::plain(tags)
    }
}

impl<T: Tag> From<&[T]> for TagRef {
    fn from(tags: &[T]) -> Self {
        Self::plain(tags)
    }
}

impl<K: Tag, V: Display> TryFrom<BTreeMap<K, V>> for TagRef {
    type Error = TagError;

    fn try_from(map: BTreeMap<K, V>) -> Result<Self, Self::Error> {
        Self::from_map(map.into_iter())
    }
}

impl<K: Tag, V: Display, S> TryFrom<HashMap<K, V, S>> for TagRef {
    type Error = TagError;

    fn try_from(map: HashMap<K, V, S>) -> Result<Self, Self::Error> {
        Self::from_map(map.into_iter())
    }
}
