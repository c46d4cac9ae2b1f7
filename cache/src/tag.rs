use std::{borrow::Cow, fmt::Display};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::cfg_debug::CfgDebug;

/// Anything that can name a tag.
///
/// Two values naming the same tag must return the same id, in this process
/// and in any other process sharing the store.
pub trait Tag: CfgDebug {
    fn id(&self) -> Cow<'_, str>;
}

impl Tag for str {
    fn id(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl Tag for String {
    fn id(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl<T: Tag + ?Sized> Tag for &T {
    fn id(&self) -> Cow<'_, str> {
        (**self).id()
    }
}

impl Tag for OffsetDateTime {
    fn id(&self) -> Cow<'_, str> {
        Cow::Owned(format!("time:{}", self.unix_timestamp_nanos()))
    }
}

macro_rules! integer_tag {
    ($($int:ty),*) => {
        $(
            impl Tag for $int {
                fn id(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }
            }
        )*
    };
}

integer_tag!(i32, i64, u32, u64, usize);

/// Canonical form of a tag, used as the registry key suffix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(String);

impl TagId {
    pub fn new(tag: &(impl Tag + ?Sized)) -> Self {
        Self(tag.id().into_owned())
    }

    /// Derives an id from the content of an arbitrary serializable value.
    ///
    /// Map keys are sorted before hashing, so equal values give equal ids
    /// regardless of field or insertion order.
    pub fn of<T: Serialize + ?Sized>(object: &T) -> Result<Self, serde_json::Error> {
        let canonical = serde_json::to_value(object)?.to_string();
        let digest = Sha256::digest(canonical.as_bytes());

        Ok(Self(format!("object:{}", hex::encode(digest))))
    }

    /// Registry slot of one version of a tag.
    ///
    /// Each version gets a generation counter of its own, apart from the
    /// plain slot of `id` and from every other version.
    pub fn versioned(id: &TagId, version: &str) -> Self {
        let canonical = serde_json::json!([id.as_str(), version]).to_string();
        let digest = Sha256::digest(canonical.as_bytes());

        Self(format!("versioned:{}", hex::encode(digest)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Tag for TagId {
    fn id(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.0)
    }
}

impl Display for TagId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
