//! Filesystem backed store.
//!
//! Every key lives in its own JSON file under the root directory, named after
//! the sha256 of the key and fanned out over 256 sub directories. Writes go to
//! a temporary file first and are renamed into place, so readers never see a
//! partially written entry.
//!
//! `add` and `increment` are atomic within one process only. Two processes
//! incrementing the same key at the same time may lose one of the increments.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use cache::{Store, StoreError, next_counter};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

pub struct FileCache {
    root: PathBuf,
    lock: Mutex<()>,
    temp_files: AtomicU64,
}

#[derive(Serialize, Deserialize)]
struct FileEntry {
    key: String,
    /// unix nanos
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<i128>,
    value: String,
}

impl FileEntry {
    fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|at| at <= OffsetDateTime::now_utc().unix_timestamp_nanos())
    }
}

impl FileCache {
    /// Opens (and creates if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            lock: Mutex::new(()),
            temp_files: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        let name = hex::encode(digest);

        self.root.join(&name[..2]).join(name)
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn load(&self, key: &str) -> Result<Option<FileEntry>, StoreError> {
        let path = self.path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry = serde_json::from_slice::<FileEntry>(&bytes)
            .map_err(|e| StoreError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        // a sha256 collision, or a foreign file
        if entry.key != key {
            return Ok(None);
        }

        if entry.is_expired() {
            #[cfg(feature = "tracing")]
            tracing::debug!(%key, "expired");

            remove(&path)?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    fn decode(key: &str, entry: &FileEntry) -> Result<Vec<u8>, StoreError> {
        STANDARD.decode(&entry.value).map_err(|e| {
            StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("corrupt value for `{key}` :: {e}"),
            ))
        })
    }

    fn save(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
        let entry = FileEntry {
            key: key.to_string(),
            expires_at: ttl.map(|ttl| {
                OffsetDateTime::now_utc().unix_timestamp_nanos() + ttl.as_nanos() as i128
            }),
            value: STANDARD.encode(value),
        };
        let bytes = serde_json::to_vec(&entry)
            .map_err(|e| StoreError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let path = self.path(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let temp = path.with_extension(format!(
            "{}-{}.tmp",
            std::process::id(),
            self.temp_files.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &path).inspect_err(|_| {
            let _ = fs::remove_file(&temp);
        })?;

        Ok(())
    }
}

impl std::fmt::Debug for FileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCache")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Store for FileCache {
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", fields(%key), skip_all)
    )]
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match self.load(key)? {
            Some(entry) => Self::decode(key, &entry).map(Some),
            None => Ok(None),
        }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "trace", fields(%key, ?ttl), skip_all)
    )]
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), StoreError> {
        self.save(key, value, ttl)
    }

    fn add(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<bool, StoreError> {
        let _guard = self.lock();
        if self.load(key)?.is_some() {
            return Ok(false);
        }

        self.save(key, value, ttl)?;
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let _guard = self.lock();
        if self.load(key)?.is_none() {
            return Ok(false);
        }

        remove(&self.path(key))
    }

    fn increment(&self, key: &str) -> Result<u64, StoreError> {
        let _guard = self.lock();
        let (next, bytes) = match self.load(key)? {
            Some(entry) => next_counter(key, Some(&Self::decode(key, &entry)?))?,
            None => next_counter(key, None)?,
        };

        self.save(key, &bytes, None)?;
        Ok(next)
    }
}

fn remove(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
