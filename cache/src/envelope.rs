use serde::{Deserialize, Serialize};

use crate::{Stamp, TagId};

/// What is actually stored under a user key.
#[derive(Serialize, Deserialize)]
pub(crate) struct Envelope<V> {
    pub value: V,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Captured>,
}

/// A registry slot and its stamp as seen at write time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Captured {
    pub id: TagId,
    pub stamp: String,
}

impl Captured {
    pub fn new(id: TagId, stamp: Stamp) -> Self {
        Self {
            id,
            stamp: stamp.as_str().to_string(),
        }
    }

    /// Valid while the slot is still at the captured generation.
    pub fn is_valid(&self, current: &Stamp) -> bool {
        current.as_str() == self.stamp
    }
}
