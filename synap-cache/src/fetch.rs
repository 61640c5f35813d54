//! Read-through helpers
//!
//! Look a key up in a cache and, on a miss, load it from the source of truth
//! and write it back. Write-back failures are logged and do not fail the
//! lookup; the loaded value is still returned.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::Result;
use crate::traits::{Getter, MGetter, MSetter, Setter};

/// Fetch one key through `cache`, calling `loader` on a miss.
///
/// A cache error is returned as-is; the loader is not consulted. A loader
/// returning `Ok(None)` means the key does not exist and nothing is cached.
pub fn fetch_one<K, V, C, F>(cache: &C, key: &K, ttl: Duration, loader: F) -> Result<Option<V>>
where
    K: Clone,
    V: Clone,
    C: Getter<K, V> + Setter<K, V> + ?Sized,
    F: FnOnce(&K) -> Result<Option<V>>,
{
    if let Some(value) = cache.get(key)? {
        return Ok(Some(value));
    }

    let loaded = loader(key)?;
    if let Some(value) = &loaded {
        if let Err(e) = cache.set(key.clone(), value.clone(), ttl) {
            warn!("Failed to cache loaded value: {}", e);
        }
    }
    Ok(loaded)
}

/// Fetch many keys through `cache`, calling `loader` once with the misses.
///
/// The result is index-aligned with `keys`. Keys the loader does not return
/// stay `None`. The loader is not called when every key hits.
pub fn fetch_multi<K, V, C, F>(
    cache: &C,
    keys: &[K],
    ttl: Duration,
    loader: F,
) -> Result<Vec<Option<V>>>
where
    K: Clone + Eq + Hash,
    V: Clone,
    C: MGetter<K, V> + MSetter<K, V> + ?Sized,
    F: FnOnce(&[K]) -> Result<HashMap<K, V>>,
{
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut values = cache.mget(keys)?;
    values.resize_with(keys.len(), || None);

    let mut seen: HashSet<&K> = HashSet::new();
    let mut missing: Vec<K> = Vec::new();
    for (key, value) in keys.iter().zip(values.iter()) {
        if value.is_none() && seen.insert(key) {
            missing.push(key.clone());
        }
    }
    if missing.is_empty() {
        return Ok(values);
    }

    debug!("Loading {} of {} keys from source", missing.len(), keys.len());
    let loaded = loader(&missing)?;
    if loaded.is_empty() {
        return Ok(values);
    }

    for (key, value) in keys.iter().zip(values.iter_mut()) {
        if value.is_none() {
            *value = loaded.get(key).cloned();
        }
    }
    let count = loaded.len();
    if let Err(e) = cache.mset(loaded, ttl) {
        warn!("Failed to cache {} loaded values: {}", count, e);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;
    use crate::lru::LruCache;
    use std::cell::Cell;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_fetch_one_loads_and_caches() {
        let cache: LruCache<String, i32> = LruCache::new(10, 0).unwrap();
        let calls = Cell::new(0);
        let load = |_: &String| {
            calls.set(calls.get() + 1);
            Ok(Some(42))
        };

        assert_eq!(fetch_one(&cache, &"k".to_string(), MINUTE, load).unwrap(), Some(42));
        assert_eq!(fetch_one(&cache, &"k".to_string(), MINUTE, load).unwrap(), Some(42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_fetch_one_absent_is_not_cached() {
        let cache: LruCache<String, i32> = LruCache::new(10, 0).unwrap();
        let value = fetch_one(&cache, &"k".to_string(), MINUTE, |_| Ok(None)).unwrap();
        assert_eq!(value, None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fetch_one_loader_error() {
        let cache: LruCache<String, i32> = LruCache::new(10, 0).unwrap();
        let result = fetch_one(&cache, &"k".to_string(), MINUTE, |_| {
            Err(CacheError::Loader("db down".to_string()))
        });
        assert!(matches!(result, Err(CacheError::Loader(_))));
    }

    #[test]
    fn test_fetch_multi_loads_only_missing() {
        let cache: LruCache<String, i32> = LruCache::new(10, 0).unwrap();
        cache.set("a".to_string(), 1, MINUTE).unwrap();

        let keys = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let values = fetch_multi(&cache, &keys, MINUTE, |missing| {
            assert_eq!(missing, ["b".to_string(), "c".to_string()]);
            Ok(HashMap::from([("b".to_string(), 2)]))
        })
        .unwrap();

        assert_eq!(values, vec![Some(1), Some(2), None]);
        assert_eq!(cache.get(&"b".to_string()).unwrap(), Some(2));
    }

    #[test]
    fn test_fetch_multi_dedups_missing_keys() {
        let cache: LruCache<u32, u32> = LruCache::new(20_000, 0).unwrap();
        let keys: Vec<u32> = (0..10_000).chain(0..10_000).collect();

        let values = fetch_multi(&cache, &keys, MINUTE, |missing| {
            assert_eq!(missing.len(), 10_000);
            assert!(missing.iter().copied().eq(0..10_000));
            Ok(missing.iter().map(|&k| (k, k * 2)).collect())
        })
        .unwrap();

        assert_eq!(values.len(), 20_000);
        assert_eq!(values[3], Some(6));
        assert_eq!(values[10_003], Some(6));
        assert_eq!(cache.len(), 10_000);
    }

    #[test]
    fn test_fetch_multi_all_hits_skip_loader() {
        let cache: LruCache<String, i32> = LruCache::new(10, 0).unwrap();
        cache.set("a".to_string(), 1, MINUTE).unwrap();

        let values = fetch_multi(&cache, &["a".to_string()], MINUTE, |_| {
            panic!("loader must not run")
        })
        .unwrap();
        assert_eq!(values, vec![Some(1)]);
    }
}
