use std::error::Error;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("io error :: {0}")]
    Io(#[from] std::io::Error),

    #[error("value at `{0}` is not an integer")]
    NotAnInteger(String),

    #[error("backend error :: {0}")]
    Backend(#[source] Box<dyn Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a client error from a store implementation living outside this crate.
    pub fn backend(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self::Backend(err.into())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TagError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cannot (de)serialize cache entry :: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid tag reference :: {0}")]
    InvalidTagRef(String),

    #[error("stamp at `{0}` is not valid utf-8")]
    InvalidStamp(String),
}
