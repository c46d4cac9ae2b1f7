use std::env;

/// Redis connection settings.
///
/// # Environment Variables
///
/// - `REDIS_URL`: single node URL (default: `redis://127.0.0.1:6379`)
/// - `REDIS_CLUSTER_NODES`: comma separated cluster node URLs (default: none)
/// - `CACHE_PREFIX`: prefix for every key (default: `cache`)
#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
    pub cluster_nodes: Vec<String>,
    /// Keeps cache keys apart from other users of the same server.
    pub key_prefix: String,
}

impl RedisConfig {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            url: env::var("REDIS_URL").unwrap_or(default.url),
            cluster_nodes: env::var("REDIS_CLUSTER_NODES")
                .map(|nodes| {
                    nodes
                        .split(',')
                        .map(str::trim)
                        .filter(|node| !node.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(default.cluster_nodes),
            key_prefix: env::var("CACHE_PREFIX").unwrap_or(default.key_prefix),
        }
    }

    pub fn prefixed_key(&self, key: &str) -> String {
        prefixed(&self.key_prefix, key)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".into(),
            cluster_nodes: Vec::new(),
            key_prefix: "cache".into(),
        }
    }
}

pub(crate) fn prefixed(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}:{key}")
    }
}
