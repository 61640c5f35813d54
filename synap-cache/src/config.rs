use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::chain::{Chain, Tier};
use crate::error::Result;
use crate::file::{FileCache, FileCacheConfig};
use crate::lru::LruCache;
use crate::traits::Cache;

/// Cache configuration, usually loaded from YAML by the embedding application
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub lru: LruSection,
    pub file: FileSection,
    pub chain: ChainSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LruSection {
    pub capacity: usize,
    /// Reads served per write, 0 = unlimited
    pub max_used: usize,
    /// TTL of the in-memory tier inside a chain
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSection {
    pub directory: PathBuf,
    pub gc_interval_secs: u64,
    /// TTL of the file tier inside a chain
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainSection {
    pub continue_on_read_err: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lru: LruSection {
                capacity: 10_000,
                max_used: 0,
                ttl_secs: 60,
            },
            file: FileSection {
                directory: PathBuf::from("./data/cache"),
                gc_interval_secs: 60,
                ttl_secs: 3600,
            },
            chain: ChainSection::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

impl Default for LruSection {
    fn default() -> Self {
        CacheConfig::default().lru
    }
}

impl Default for FileSection {
    fn default() -> Self {
        CacheConfig::default().file
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        CacheConfig::default().logging
    }
}

impl CacheConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CacheConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Convert to FileCacheConfig
    pub fn file_config(&self) -> FileCacheConfig {
        FileCacheConfig {
            directory: self.file.directory.clone(),
            gc_interval: Duration::from_secs(self.file.gc_interval_secs),
        }
    }

    pub fn build_lru<K, V>(&self) -> Result<LruCache<K, V>>
    where
        K: Eq + Hash + Clone,
    {
        LruCache::new(self.lru.capacity, self.lru.max_used)
    }

    pub fn build_file<K, V>(&self) -> FileCache<K, V> {
        FileCache::new(self.file_config())
    }

    /// Two-level chain: in-memory LRU in front of the file cache
    pub fn build_chain<K, V>(&self) -> Result<Chain<K, V>>
    where
        K: Eq + Hash + Clone + Display + Send + Sync + 'static,
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let memory: Arc<dyn Cache<K, V>> = Arc::new(self.build_lru::<K, V>()?);
        let disk: Arc<dyn Cache<K, V>> = Arc::new(self.build_file::<K, V>());

        Ok(Chain::new(vec![
            Tier::new(memory, Duration::from_secs(self.lru.ttl_secs)),
            Tier::new(disk, Duration::from_secs(self.file.ttl_secs)),
        ])
        .with_continue_on_read_err(self.chain.continue_on_read_err))
    }
}
