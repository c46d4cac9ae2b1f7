use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use cache::{Store, StoreError, next_counter};
use dashmap::DashMap;

/// In-process store holding about `capacity` entries.
///
/// When full, expired entries are dropped first, then the least recently
/// written ones. The bound is soft: room is made before the insert and not
/// under the same shard lock, so writers racing on new keys can each add one
/// entry past `capacity` until the next write trims it again.
pub struct DashCache {
    entries: DashMap<String, Slot>,
    capacity: usize,
    writes: AtomicU64,
}

struct Slot {
    value: Vec<u8>,
    expires_at: Option<Instant>,
    written: u64,
}

impl Slot {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl DashCache {
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            writes: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored entries, expired ones not yet purged included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn slot(&self, value: Vec<u8>, ttl: Option<Duration>) -> Slot {
        Slot {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
            written: self.tick(),
        }
    }

    #[inline]
    fn tick(&self) -> u64 {
        self.writes.fetch_add(1, Ordering::Relaxed)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", fields(%key), skip_all)
    )]
    fn make_room(&self, key: &str) {
        if self.entries.len() < self.capacity || self.entries.contains_key(key) {
            return;
        }

        let now = Instant::now();
        self.entries.retain(|_, slot| !slot.is_expired(now));

        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|slot| slot.written)
                .map(|slot| slot.key().clone());

            let Some(oldest) = oldest else { break };
            self.entries.remove(&oldest);

            #[cfg(feature = "tracing")]
            tracing::debug!(key = %oldest, "evicted");
        }
    }
}

impl Default for DashCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DashCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashCache")
            .field("len", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl Store for DashCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let now = Instant::now();
        match self.entries.get(key) {
            None => return Ok(None),
            Some(slot) if !slot.is_expired(now) => return Ok(Some(slot.value.clone())),
            Some(_) => {}
        }

        self.entries.remove_if(key, |_, slot| slot.is_expired(now));
        Ok(None)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
        self.make_room(key);
        let slot = self.slot(value.to_vec(), ttl);
        self.entries.insert(key.to_string(), slot);
        Ok(())
    }

    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<bool, StoreError> {
        self.make_room(key);
        let now = Instant::now();

        match self.entries.entry(key.to_string()) {
            dashmap::Entry::Occupied(mut entry) => {
                if !entry.get().is_expired(now) {
                    return Ok(false);
                }
                entry.insert(self.slot(value.to_vec(), ttl));
            }
            dashmap::Entry::Vacant(entry) => {
                entry.insert(self.slot(value.to_vec(), ttl));
            }
        }

        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, slot)| !slot.is_expired(now)))
    }

    fn increment(&self, key: &str) -> Result<u64, StoreError> {
        self.make_room(key);
        let now = Instant::now();

        match self.entries.entry(key.to_string()) {
            dashmap::Entry::Occupied(mut entry) if !entry.get().is_expired(now) => {
                let (next, bytes) = next_counter(key, Some(&entry.get().value))?;
                let slot = entry.get_mut();
                slot.value = bytes;
                slot.written = self.tick();
                Ok(next)
            }
            dashmap::Entry::Occupied(mut entry) => {
                let (next, bytes) = next_counter(key, None)?;
                entry.insert(self.slot(bytes, None));
                Ok(next)
            }
            dashmap::Entry::Vacant(entry) => {
                let (next, bytes) = next_counter(key, None)?;
                entry.insert(self.slot(bytes, None));
                Ok(next)
            }
        }
    }
}
