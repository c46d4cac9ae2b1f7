use std::env;

/// Settings of the tagging layer.
///
/// # Environment Variables
///
/// - `CACHE_TAG_NAMESPACE`: prefix of registry keys (default: `tag`)
/// - `CACHE_TAG_DELETE_STALE`: delete entries found stale on read (default: `true`)
#[derive(Clone, Debug)]
pub struct Config {
    /// Registry stamps live under `<namespace>:<tag id>`. No user key may
    /// start with this prefix.
    pub namespace: String,

    /// Best-effort delete of an entry once a read finds it stale.
    pub delete_stale: bool,
}

impl Config {
    pub const DEFAULT_NAMESPACE: &'static str = "tag";

    pub fn from_env() -> Self {
        Self {
            namespace: env::var("CACHE_TAG_NAMESPACE")
                .ok()
                .filter(|ns| !ns.is_empty())
                .unwrap_or_else(|| Self::DEFAULT_NAMESPACE.into()),
            delete_stale: env::var("CACHE_TAG_DELETE_STALE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }

    /// Whether `key` falls under the registry namespace.
    pub fn is_registry_key(&self, key: &str) -> bool {
        key.strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.starts_with(':'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: Self::DEFAULT_NAMESPACE.into(),
            delete_stale: true,
        }
    }
}
