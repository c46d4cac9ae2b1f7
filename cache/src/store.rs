use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::StoreError;

/// Byte-level key-value store the tagging layer is built on.
///
/// `add` and `increment` must be atomic with respect to concurrent callers on
/// the same key. A store that cannot offer that still works, but two racing
/// tag deletions may then count as one.
pub trait Store {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Stores `value` only if `key` currently holds nothing.
    /// Returns `true` when the value was stored.
    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<bool, StoreError>;

    /// Returns `true` if something was removed.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Increments the decimal integer stored at `key` and returns the new value.
    /// A missing key counts as `0`.
    fn increment(&self, key: &str) -> Result<u64, StoreError>;

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.get(key).map(|value| value.is_some())
    }

    /// Missing keys are left out of the returned map.
    fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.get(key)? {
                found.insert(key.to_string(), value);
            }
        }
        Ok(found)
    }
}

/// Computes the successor of a stored counter for stores without a native
/// increment. Returns the new value and its encoded form.
pub fn next_counter(key: &str, current: Option<&[u8]>) -> Result<(u64, Vec<u8>), StoreError> {
    let current = match current {
        None => 0,
        Some(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or_else(|| StoreError::NotAnInteger(key.to_string()))?,
    };

    let next = current.wrapping_add(1);
    Ok((next, next.to_string().into_bytes()))
}

macro_rules! forward_store {
    ($($ty:ty),*) => {
        $(
            impl<S: Store + ?Sized> Store for $ty {
                #[inline]
                fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
                    (**self).get(key)
                }

                #[inline]
                fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
                    (**self).set(key, value, ttl)
                }

                #[inline]
                fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<bool, StoreError> {
                    (**self).add(key, value, ttl)
                }

                #[inline]
                fn delete(&self, key: &str) -> Result<bool, StoreError> {
                    (**self).delete(key)
                }

                #[inline]
                fn increment(&self, key: &str) -> Result<u64, StoreError> {
                    (**self).increment(key)
                }

                #[inline]
                fn exists(&self, key: &str) -> Result<bool, StoreError> {
                    (**self).exists(key)
                }

                #[inline]
                fn get_multi(&self, keys: &[&str]) -> Result<HashMap<String, Vec<u8>>, StoreError> {
                    (**self).get_multi(keys)
                }
            }
        )*
    };
}

forward_store!(&S, Arc<S>, Box<S>);
