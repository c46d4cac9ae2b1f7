#![allow(dead_code)]

use std::fmt::Debug;

use cache::{Store, TaggedCache};
use serde::{Serialize, de::DeserializeOwned};

pub mod macros;
pub mod scenarios;
pub mod setup;

/// Payload written by the scenarios.
pub trait Fixture: Serialize + DeserializeOwned + PartialEq + Debug + Clone {
    fn sample() -> Self;
    fn other() -> Self;
}

impl Fixture for String {
    fn sample() -> Self {
        "bar".to_string()
    }

    fn other() -> Self {
        "baz".to_string()
    }
}

#[derive(Serialize, serde::Deserialize, PartialEq, Debug, Clone)]
pub struct ComplexObject {
    pub value: String,
}

impl Fixture for ComplexObject {
    fn sample() -> Self {
        Self {
            value: "bar".to_string(),
        }
    }

    fn other() -> Self {
        Self {
            value: "baz".to_string(),
        }
    }
}

pub fn assert_read<S, V>(cache: &TaggedCache<S>, key: &str, expected: &V)
where
    S: Store,
    V: Fixture,
{
    assert!(cache.exists(key).unwrap(), "expected `{key}` to exist");
    assert_eq!(cache.read::<V>(key).unwrap().as_ref(), Some(expected));
}

pub fn assert_blank<S, V>(cache: &TaggedCache<S>, key: &str)
where
    S: Store,
    V: Fixture,
{
    assert!(!cache.exists(key).unwrap(), "expected `{key}` to be blank");
    assert_eq!(cache.read::<V>(key).unwrap(), None);
}
