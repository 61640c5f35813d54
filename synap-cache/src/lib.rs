//! Synap Cache
//!
//! A unified cache contract with interchangeable backends:
//!
//! - [`LruCache`]: in-memory cache with LRU, usage-count and TTL eviction
//! - [`FileCache`]: single-node file cache with self-healing reads and a
//!   throttled background sweep
//! - [`Chain`]: stacks caches into a read-through hierarchy (e.g. LRU in front
//!   of a file or remote cache)
//! - [`NoCache`]: always misses, always accepts writes
//!
//! [`mget`] wraps a batch read into an [`MGetResult`]; [`fetch_one`] and
//! [`fetch_multi`] add loading from a source of truth with cache write-back.

pub mod chain;
pub mod config;
pub mod error;
pub mod fetch;
pub mod file;
pub mod lru;
pub mod mget;
pub mod noop;
pub mod traits;

// Re-export commonly used types
pub use chain::{Chain, Tier};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use fetch::{fetch_multi, fetch_one};
pub use file::{CACHE_FILE_EXT, DEFAULT_GC_INTERVAL, FileCache, FileCacheConfig};
pub use lru::{LruCache, LruStats};
pub use mget::{MGetResult, mget};
pub use noop::NoCache;
pub use traits::{Cache, Deleter, Getter, MCache, MGetter, MSetter, SCache, Setter};
