use cache::{LocalCache, Store, TaggedCache};
use dashcache::DashCache;
use filecache::FileCache;
use tempfile::TempDir;

/// A tagged cache plus whatever must outlive it.
pub struct Harness<S> {
    pub cache: TaggedCache<S>,
    _dir: Option<TempDir>,
}

impl<S> Harness<S>
where
    S: Store + Scoped,
{
    pub fn run(&self, f: impl FnOnce(&TaggedCache<S>)) {
        self.cache.store().scoped(|| f(&self.cache))
    }
}

/// Runs scenarios inside a local cache scope where the store has one.
pub trait Scoped {
    fn scoped<R>(&self, f: impl FnOnce() -> R) -> R;
}

impl Scoped for DashCache {
    fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

impl Scoped for FileCache {
    fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

impl<S: Store> Scoped for LocalCache<S> {
    fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        self.with_local_cache(f)
    }
}

pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("unable to create temp dir")
}

pub fn memory() -> Harness<DashCache> {
    Harness {
        cache: TaggedCache::new(DashCache::with_capacity(100)),
        _dir: None,
    }
}

pub fn file() -> Harness<FileCache> {
    let dir = temp_dir();
    let store = FileCache::open(dir.path()).expect("unable to open file cache");

    Harness {
        cache: TaggedCache::new(store),
        _dir: Some(dir),
    }
}

pub fn local_memory() -> Harness<LocalCache<DashCache>> {
    Harness {
        cache: TaggedCache::new(LocalCache::new(DashCache::with_capacity(100))),
        _dir: None,
    }
}

pub fn local_file() -> Harness<LocalCache<FileCache>> {
    let dir = temp_dir();
    let store = FileCache::open(dir.path()).expect("unable to open file cache");

    Harness {
        cache: TaggedCache::new(LocalCache::new(store)),
        _dir: Some(dir),
    }
}

#[cfg(feature = "tracing")]
static TRACING_INIT: std::sync::Once = std::sync::Once::new();

#[cfg(feature = "tracing")]
pub fn tracing_init() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .init();
    });
}
