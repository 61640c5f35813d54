//! File Cache
//!
//! Single-node persistent cache storing one JSON record per key. Record
//! paths are derived from a SHA-256 digest of the key and sharded into
//! nested directories so no single directory grows too large:
//!
//! ```text
//! <root>/3f2/a9c/01b/e47/d55/<remaining 49 hex chars>.cache
//! ```
//!
//! Writes go to a temporary file in the shard directory that is then renamed
//! over the record, so readers see either the old record or the new one.
//! Reads validate the record: corrupt files are removed and reported,
//! expired files are removed and reported as a miss. A throttled background
//! sweep runs the same validation over the whole tree.
//!
//! Intended for modest key counts (thousands, not millions); every entry is
//! a file on disk.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::io::{ErrorKind, Write};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{CacheError, Result};
use crate::traits::{Deleter, Getter, MGetter, MSetter, Setter};

/// Extension carried by every record file
pub const CACHE_FILE_EXT: &str = "cache";

/// Default interval between background sweeps
pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60);

/// Width of each directory segment taken from the hex digest
const SHARD_WIDTH: usize = 3;
/// Number of directory levels below the root
const SHARD_DEPTH: usize = 5;

/// File cache configuration
#[derive(Debug, Clone)]
pub struct FileCacheConfig {
    /// Root directory of the record tree, required
    pub directory: PathBuf,
    /// Minimum time between two background sweeps; zero selects the default
    pub gc_interval: Duration,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./data/cache"),
            gc_interval: DEFAULT_GC_INTERVAL,
        }
    }
}

/// Record persisted for each key
#[derive(Debug, Serialize, Deserialize)]
struct FileRecord<V> {
    value: V,
    key: String,
    ttl_nanos: u64,
    created_at: DateTime<Utc>,
    expires_at_nanos: i64,
}

impl<V> FileRecord<V> {
    fn is_alive(&self, now_nanos: i64) -> bool {
        self.expires_at_nanos > now_nanos
    }
}

/// Outcome of reading one record file
enum Loaded<T> {
    Alive(T),
    Missing,
    /// The record was expired and has been deleted
    Removed,
}

/// Single-flight claim and throttle for the background sweep
///
/// Owned by one cache instance and shared only with the sweep task it
/// spawns.
#[derive(Debug)]
struct SweepHandle {
    running: AtomicBool,
    /// Unix millis of the last completed sweep, 0 until the first call
    last_run_ms: AtomicI64,
    interval_ms: i64,
}

impl SweepHandle {
    fn new(interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_GC_INTERVAL
        } else {
            interval
        };
        Self {
            running: AtomicBool::new(false),
            last_run_ms: AtomicI64::new(0),
            interval_ms: i64::try_from(interval.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Claim the right to run a sweep now.
    ///
    /// The first call only arms the timer, so a fresh instance waits one full
    /// interval before sweeping.
    fn try_claim(&self) -> bool {
        if self.running.load(Ordering::Acquire) {
            return false;
        }

        let now = Utc::now().timestamp_millis();
        let last = self.last_run_ms.load(Ordering::Acquire);
        if last == 0 {
            let _ = self
                .last_run_ms
                .compare_exchange(0, now, Ordering::AcqRel, Ordering::Acquire);
            return false;
        }
        if now.saturating_sub(last) < self.interval_ms {
            return false;
        }

        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        self.last_run_ms
            .store(Utc::now().timestamp_millis(), Ordering::Release);
        self.running.store(false, Ordering::Release);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// File-backed cache
///
/// A zero TTL writes a record that is already expired; the next read
/// deletes it and reports a miss.
///
/// There is no per-key locking: concurrent writers to the same key race at
/// the filesystem level and the last write wins.
pub struct FileCache<K, V> {
    directory: PathBuf,
    sweeper: Arc<SweepHandle>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> FileCache<K, V> {
    /// Create a file cache; the directory is created lazily on first write
    pub fn new(config: FileCacheConfig) -> Self {
        info!(
            "Initializing file cache at {:?} (gc_interval={:?})",
            config.directory, config.gc_interval
        );

        Self {
            directory: config.directory,
            sweeper: Arc::new(SweepHandle::new(config.gc_interval)),
            _marker: PhantomData,
        }
    }

    /// Root directory of the record tree
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn root(&self) -> Result<&Path> {
        if self.directory.as_os_str().is_empty() {
            return Err(CacheError::MissingDirectory);
        }
        Ok(&self.directory)
    }

    /// Whether a background sweep is currently in flight
    pub fn is_sweeping(&self) -> bool {
        self.sweeper.is_running()
    }

    /// Delete every record file under the root.
    ///
    /// Returns the number of removed records. Failures are summarised as a
    /// count plus the last error.
    pub fn purge(&self) -> Result<usize> {
        let root = self.root()?;
        let mut removed = 0;
        let mut failures = 0;
        let mut last = None;

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if let Some(err) = walk_error(root, e) {
                        failures += 1;
                        last = Some(err);
                    }
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || !is_record_file(path) {
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    failures += 1;
                    last = Some(CacheError::io(path, e));
                }
            }
        }

        info!("File cache PURGE: {} records removed", removed);
        match last {
            None => Ok(removed),
            Some(last) => Err(CacheError::Purge {
                failures,
                last: Box::new(last),
            }),
        }
    }

    /// Run a sweep on the calling thread, bypassing the throttle.
    ///
    /// Returns the number of expired or corrupt records removed.
    pub fn sweep_now(&self) -> Result<usize> {
        let root = self.root()?;
        Ok(sweep_tree(root))
    }

    /// Start a background sweep if none is running and the interval elapsed
    fn maybe_sweep(&self) {
        if !self.sweeper.try_claim() {
            return;
        }

        let handle = Arc::clone(&self.sweeper);
        let root = self.directory.clone();
        let task = move || run_sweep(&handle, &root, || sweep_tree(&root));

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(task);
            }
            Err(_) => {
                let spawned = thread::Builder::new()
                    .name("synap-cache-sweep".to_string())
                    .spawn(task);
                if let Err(e) = spawned {
                    warn!("Failed to spawn file cache sweep: {}", e);
                    self.sweeper.release();
                }
            }
        }
    }
}

impl<K: Display, V> FileCache<K, V> {
    /// Path of the record file for `key`
    pub fn path_for(&self, key: &K) -> PathBuf {
        record_path(&self.directory, &key.to_string())
    }
}

impl<K, V> FileCache<K, V>
where
    K: Display,
    V: DeserializeOwned,
{
    fn read(&self, key: &K) -> Result<Option<V>> {
        let path = self.path_for(key);
        match load::<V>(&path)? {
            Loaded::Alive(value) => Ok(Some(value)),
            Loaded::Missing | Loaded::Removed => Ok(None),
        }
    }
}

impl<K, V> FileCache<K, V>
where
    K: Display,
    V: Serialize,
{
    fn write(&self, root: &Path, key: &K, value: V, ttl: Duration) -> Result<()> {
        let rendered = key.to_string();
        let path = record_path(root, &rendered);

        let now = Utc::now();
        let ttl_nanos = u64::try_from(ttl.as_nanos()).unwrap_or(u64::MAX);
        let record = FileRecord {
            value,
            key: rendered,
            ttl_nanos,
            created_at: now,
            expires_at_nanos: nanos(now)
                .saturating_add(i64::try_from(ttl_nanos).unwrap_or(i64::MAX)),
        };
        let content = serde_json::to_vec_pretty(&record)?;

        let parent = path.parent().unwrap_or(root);
        fs::create_dir_all(parent)
            .map_err(|e| CacheError::io(parent, e))?;

        // Temp names carry no record extension, so sweeps and purges skip them
        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|e| CacheError::io(parent, e))?;
        tmp.write_all(&content)
            .map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| CacheError::io(&path, e.error))?;

        debug!("File cache SET {:?}", path);
        Ok(())
    }
}

impl<K, V> Getter<K, V> for FileCache<K, V>
where
    K: Display,
    V: DeserializeOwned,
{
    fn get(&self, key: &K) -> Result<Option<V>> {
        self.root()?;
        let result = self.read(key);
        self.maybe_sweep();
        result
    }
}

impl<K, V> MGetter<K, V> for FileCache<K, V>
where
    K: Display,
    V: DeserializeOwned,
{
    fn mget(&self, keys: &[K]) -> Result<Vec<Option<V>>> {
        self.root()?;
        let result = keys.iter().map(|key| self.read(key)).collect();
        self.maybe_sweep();
        result
    }
}

impl<K, V> Setter<K, V> for FileCache<K, V>
where
    K: Display,
    V: Serialize,
{
    fn set(&self, key: K, value: V, ttl: Duration) -> Result<()> {
        let root = self.root()?;
        let result = self.write(root, &key, value, ttl);
        self.maybe_sweep();
        result
    }
}

impl<K, V> MSetter<K, V> for FileCache<K, V>
where
    K: Display + Eq + std::hash::Hash,
    V: Serialize,
{
    fn mset(&self, kvs: HashMap<K, V>, ttl: Duration) -> Result<()> {
        let root = self.root()?;
        let errors = kvs
            .into_iter()
            .filter_map(|(key, value)| self.write(root, &key, value, ttl).err())
            .collect();
        self.maybe_sweep();
        CacheError::join(errors)
    }
}

impl<K, V> Deleter<K> for FileCache<K, V>
where
    K: Display,
{
    fn delete(&self, keys: &[K]) -> Result<()> {
        let root = self.root()?;
        let mut errors = Vec::new();
        for key in keys {
            let path = record_path(root, &key.to_string());
            match fs::remove_file(&path) {
                Ok(()) => debug!("File cache DELETE {:?}", path),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => errors.push(CacheError::io(path, e)),
            }
        }
        self.maybe_sweep();
        CacheError::join(errors)
    }
}

/// Build `<root>/aaa/bbb/ccc/ddd/eee/<rest>.cache` from the key digest
fn record_path(root: &Path, key: &str) -> PathBuf {
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    let mut path = root.to_path_buf();
    for level in 0..SHARD_DEPTH {
        path.push(&digest[level * SHARD_WIDTH..(level + 1) * SHARD_WIDTH]);
    }
    path.push(&digest[SHARD_DEPTH * SHARD_WIDTH..]);
    path.set_extension(CACHE_FILE_EXT);
    path
}

fn is_record_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == CACHE_FILE_EXT)
}

fn nanos(at: DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove cache record {:?}: {}", path, e);
        }
    }
}

/// Read and validate one record, deleting it when expired or corrupt
fn load<T: DeserializeOwned>(path: &Path) -> Result<Loaded<T>> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => return Err(CacheError::io(path, e)),
    };

    let record: FileRecord<T> = match serde_json::from_slice(&content) {
        Ok(record) => record,
        Err(e) => {
            warn!("Removing corrupted cache record {:?}: {}", path, e);
            remove_quietly(path);
            return Err(CacheError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    if record.is_alive(nanos(Utc::now())) {
        Ok(Loaded::Alive(record.value))
    } else {
        debug!("Removing expired cache record {:?}", path);
        remove_quietly(path);
        Ok(Loaded::Removed)
    }
}

/// Convert a walk failure, ignoring paths that vanished mid-walk
fn walk_error(root: &Path, e: walkdir::Error) -> Option<CacheError> {
    if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) {
        return None;
    }
    let path = e.path().unwrap_or(root).to_path_buf();
    Some(CacheError::io(path, e.into()))
}

/// Run one claimed sweep; a panic is contained and the claim always released
fn run_sweep<F>(handle: &SweepHandle, root: &Path, sweep: F)
where
    F: FnOnce() -> usize,
{
    match panic::catch_unwind(AssertUnwindSafe(sweep)) {
        Ok(removed) => debug!("File cache SWEEP {:?}: {} records removed", root, removed),
        Err(_) => warn!("File cache sweep of {:?} panicked", root),
    }
    handle.release();
}

/// Validate every record under `root`; returns the number removed
fn sweep_tree(root: &Path) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if let Some(err) = walk_error(root, e) {
                    warn!("Sweep could not walk cache tree: {}", err);
                }
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_record_file(path) {
            continue;
        }
        match load::<IgnoredAny>(path) {
            Ok(Loaded::Removed) | Err(CacheError::Corrupt { .. }) => removed += 1,
            Ok(_) => {}
            Err(e) => debug!("Sweep skipped {:?}: {}", path, e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MINUTE: Duration = Duration::from_secs(60);

    fn cache_in(dir: &Path) -> FileCache<String, String> {
        FileCache::new(FileCacheConfig {
            directory: dir.to_path_buf(),
            gc_interval: Duration::from_secs(3600),
        })
    }

    #[test]
    fn test_record_path_layout() {
        let root = Path::new("/tmp/root");
        let path = record_path(root, "k1");
        let digest = hex::encode(Sha256::digest(b"k1"));

        let rel = path.strip_prefix(root).unwrap();
        let parts: Vec<_> = rel.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(parts.len(), SHARD_DEPTH + 1);
        assert_eq!(parts[0], digest[0..3]);
        assert_eq!(parts[4], digest[12..15]);
        assert_eq!(parts[5], format!("{}.{}", &digest[15..], CACHE_FILE_EXT));

        // Deterministic per key
        assert_eq!(path, record_path(root, "k1"));
        assert_ne!(path, record_path(root, "k2"));
    }

    #[test]
    fn test_set_get_roundtrip() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());

        assert_eq!(cache.get(&"k1".to_string()).unwrap(), None);
        cache.set("k1".to_string(), "v1".to_string(), MINUTE).unwrap();
        assert_eq!(cache.get(&"k1".to_string()).unwrap(), Some("v1".to_string()));
        assert!(cache.path_for(&"k1".to_string()).exists());
    }

    #[test]
    fn test_overwrite() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());

        cache.set("k".to_string(), "a".to_string(), MINUTE).unwrap();
        cache.set("k".to_string(), "b".to_string(), MINUTE).unwrap();
        assert_eq!(cache.get(&"k".to_string()).unwrap(), Some("b".to_string()));
    }

    #[test]
    fn test_record_contents() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.set("k".to_string(), "v".to_string(), MINUTE).unwrap();

        let raw = fs::read(cache.path_for(&"k".to_string())).unwrap();
        let record: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(record["value"], "v");
        assert_eq!(record["key"], "k");
        assert_eq!(record["ttl_nanos"], 60_000_000_000u64);
        assert!(record["created_at"].is_string());
        assert!(record["expires_at_nanos"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_missing_directory() {
        let cache: FileCache<String, String> = FileCache::new(FileCacheConfig {
            directory: PathBuf::new(),
            gc_interval: Duration::ZERO,
        });

        assert!(matches!(
            cache.set("k".to_string(), "v".to_string(), MINUTE),
            Err(CacheError::MissingDirectory)
        ));
        assert!(matches!(
            cache.mset(HashMap::from([("k".to_string(), "v".to_string())]), MINUTE),
            Err(CacheError::MissingDirectory)
        ));
        assert!(matches!(
            cache.delete(&["k".to_string()]),
            Err(CacheError::MissingDirectory)
        ));
        assert!(matches!(cache.get(&"k".to_string()), Err(CacheError::MissingDirectory)));
        assert!(matches!(cache.purge(), Err(CacheError::MissingDirectory)));
    }

    #[test]
    fn test_corrupt_record_is_removed() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.set("k100".to_string(), "v100".to_string(), MINUTE).unwrap();

        let path = cache.path_for(&"k100".to_string());
        fs::write(&path, b"hello").unwrap();

        let err = cache.get(&"k100".to_string()).unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
        assert!(!path.exists());
        assert_eq!(cache.get(&"k100".to_string()).unwrap(), None);
    }

    #[test]
    fn test_expired_record_is_removed() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.set("k".to_string(), "v".to_string(), Duration::from_millis(20)).unwrap();

        std::thread::sleep(Duration::from_millis(40));
        let path = cache.path_for(&"k".to_string());
        assert!(path.exists());
        assert_eq!(cache.get(&"k".to_string()).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_zero_ttl_is_already_expired() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.set("k".to_string(), "v".to_string(), Duration::ZERO).unwrap();
        assert_eq!(cache.get(&"k".to_string()).unwrap(), None);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.set("k".to_string(), "v".to_string(), MINUTE).unwrap();

        cache.delete(&["k".to_string(), "never".to_string()]).unwrap();
        cache.delete(&["k".to_string()]).unwrap();
        cache.delete(&[]).unwrap();
        assert_eq!(cache.get(&"k".to_string()).unwrap(), None);
    }

    #[test]
    fn test_mget_aborts_on_first_error() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.set("good".to_string(), "v".to_string(), MINUTE).unwrap();
        cache.set("bad".to_string(), "v".to_string(), MINUTE).unwrap();
        fs::write(cache.path_for(&"bad".to_string()), b"{").unwrap();

        let result = cache.mget(&["good".to_string(), "bad".to_string()]);
        assert!(matches!(result, Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn test_value_type_mismatch_is_corruption() {
        let dir = tempdir().unwrap();
        let strings = cache_in(dir.path());
        strings.set("k".to_string(), "text".to_string(), MINUTE).unwrap();

        let numbers: FileCache<String, u64> = FileCache::new(FileCacheConfig {
            directory: dir.path().to_path_buf(),
            gc_interval: Duration::from_secs(3600),
        });
        assert!(matches!(
            numbers.get(&"k".to_string()),
            Err(CacheError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_purge_counts_records() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        for i in 0..5 {
            cache.set(format!("k{}", i), "v".to_string(), MINUTE).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

        assert_eq!(cache.purge().unwrap(), 5);
        assert_eq!(cache.get(&"k0".to_string()).unwrap(), None);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_sweep_now_removes_expired_and_corrupt() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.set("live".to_string(), "v".to_string(), MINUTE).unwrap();
        cache.set("dead".to_string(), "v".to_string(), Duration::ZERO).unwrap();
        cache.set("junk".to_string(), "v".to_string(), MINUTE).unwrap();
        fs::write(cache.path_for(&"junk".to_string()), b"garbage").unwrap();

        assert_eq!(cache.sweep_now().unwrap(), 2);
        assert!(cache.path_for(&"live".to_string()).exists());
        assert!(!cache.path_for(&"dead".to_string()).exists());
        assert!(!cache.path_for(&"junk".to_string()).exists());
    }

    #[test]
    fn test_sweep_claim_is_throttled_and_single_flight() {
        let handle = SweepHandle::new(Duration::from_millis(30));

        // First call arms the timer only
        assert!(!handle.try_claim());
        assert!(!handle.try_claim());

        std::thread::sleep(Duration::from_millis(50));
        assert!(handle.try_claim());
        assert!(handle.is_running());
        assert!(!handle.try_claim(), "only one sweep may run at a time");

        handle.release();
        assert!(!handle.is_running());
        assert!(!handle.try_claim(), "interval restarts after a sweep");
    }

    #[test]
    fn test_concurrent_claims_admit_one_sweep() {
        let handle = Arc::new(SweepHandle::new(Duration::from_millis(10)));
        assert!(!handle.try_claim());
        std::thread::sleep(Duration::from_millis(30));

        let barrier = Arc::new(std::sync::Barrier::new(8));
        let claims: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    handle.try_claim()
                })
            })
            .collect();
        let granted = claims
            .into_iter()
            .map(|t| t.join())
            .filter(|r| matches!(r, Ok(true)))
            .count();

        assert_eq!(granted, 1);
        assert!(handle.is_running());
    }

    #[test]
    fn test_panicking_sweep_releases_claim() {
        let handle = SweepHandle::new(Duration::from_millis(10));
        assert!(!handle.try_claim());
        std::thread::sleep(Duration::from_millis(30));
        assert!(handle.try_claim());

        let armed_at = handle.last_run_ms.load(Ordering::Acquire);
        std::thread::sleep(Duration::from_millis(5));
        run_sweep(&handle, Path::new("/tmp/root"), || panic!("sweep failed"));

        assert!(!handle.is_running());
        assert!(handle.last_run_ms.load(Ordering::Acquire) > armed_at);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.set("k".to_string(), "a".to_string(), MINUTE).unwrap();
        cache.set("k".to_string(), "b".to_string(), MINUTE).unwrap();

        let shard = cache.path_for(&"k".to_string());
        let entries: Vec<_> = fs::read_dir(shard.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_purge_reports_unreadable_directories() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let cache = cache_in(dir.path());
        cache.set("locked".to_string(), "v".to_string(), MINUTE).unwrap();
        cache.set("open".to_string(), "v".to_string(), MINUTE).unwrap();

        let locked = cache.path_for(&"locked".to_string());
        let shard = locked.parent().unwrap().to_path_buf();
        fs::set_permissions(&shard, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users read through the mode bits
        if fs::read_dir(&shard).is_ok() {
            fs::set_permissions(&shard, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = cache.purge();
        fs::set_permissions(&shard, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(CacheError::Purge { failures: 1, .. })));
        assert!(locked.exists());
        assert!(!cache.path_for(&"open".to_string()).exists());
    }

    #[test]
    fn test_purge_of_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        let cache = cache_in(&dir.path().join("never-written"));
        assert_eq!(cache.purge().unwrap(), 0);
    }

    #[test]
    fn test_zero_interval_uses_default() {
        let handle = SweepHandle::new(Duration::ZERO);
        assert_eq!(handle.interval_ms, 60_000);
    }
}
