//! Chain
//!
//! Multi-level cache querying its tiers in order. A typical setup is two
//! levels:
//!
//! 1. [`LruCache`](crate::LruCache) with a short TTL
//! 2. [`FileCache`](crate::FileCache) (or a remote store) with a longer TTL
//!
//! A miss in the first tier falls through to the second; a value found there
//! is written back into the first tier before it is returned. Writes and
//! deletes go to every tier.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CacheError, Result};
use crate::traits::{Cache, Deleter, Getter, MGetter, MSetter, Setter};

/// One level of a [`Chain`]
pub struct Tier<K, V> {
    /// Backend for this level, any [`Cache`] including another chain
    pub cache: Arc<dyn Cache<K, V>>,
    /// TTL used whenever the chain writes into this level
    pub ttl: Duration,
}

impl<K, V> Tier<K, V> {
    pub fn new(cache: Arc<dyn Cache<K, V>>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }
}

impl<K, V> Clone for Tier<K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            ttl: self.ttl,
        }
    }
}

/// Cascading multi-tier cache
///
/// Tier 0 is the fastest. The tier list is fixed once the chain is built.
/// Errors from `set`, `mset` and `delete` are tagged with the index of the
/// tier that produced them.
pub struct Chain<K, V> {
    tiers: Vec<Tier<K, V>>,
    continue_on_read_err: bool,
}

impl<K, V> Chain<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(tiers: Vec<Tier<K, V>>) -> Self {
        debug!("Creating cache chain with {} tiers", tiers.len());
        Self {
            tiers,
            continue_on_read_err: false,
        }
    }

    /// Keep querying lower tiers when a tier fails on `get`/`mget`.
    ///
    /// Off by default: a read error stops the lookup and is returned.
    pub fn with_continue_on_read_err(mut self, enabled: bool) -> Self {
        self.continue_on_read_err = enabled;
        self
    }

    pub fn continue_on_read_err(&self) -> bool {
        self.continue_on_read_err
    }

    pub fn tiers(&self) -> &[Tier<K, V>] {
        &self.tiers
    }

    /// Best-effort write-back into the tiers above a hit
    fn promote(&self, upper: &[Tier<K, V>], key: &K, value: &V) {
        for (idx, tier) in upper.iter().enumerate() {
            if let Err(e) = tier.cache.set(key.clone(), value.clone(), tier.ttl) {
                warn!("Chain write-back into tier {} failed: {}", idx, e);
            }
        }
    }

    fn promote_many(&self, upper: &[Tier<K, V>], found: &HashMap<K, V>) {
        if found.is_empty() {
            return;
        }
        for (idx, tier) in upper.iter().enumerate() {
            if let Err(e) = tier.cache.mset(found.clone(), tier.ttl) {
                warn!("Chain batch write-back into tier {} failed: {}", idx, e);
            }
        }
    }

    /// Run `op` against every tier and join the failures
    fn fan_out<F>(&self, mut op: F) -> Result<()>
    where
        F: FnMut(&Tier<K, V>) -> Result<()>,
    {
        let errors = self
            .tiers
            .iter()
            .enumerate()
            .filter_map(|(tier, item)| {
                op(item).err().map(|source| CacheError::Tier {
                    tier,
                    source: Box::new(source),
                })
            })
            .collect();
        CacheError::join(errors)
    }
}

impl<K, V> Getter<K, V> for Chain<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Result<Option<V>> {
        let mut last_err = None;
        for (idx, tier) in self.tiers.iter().enumerate() {
            match tier.cache.get(key) {
                Ok(Some(value)) => {
                    debug!("Chain HIT at tier {}", idx);
                    self.promote(&self.tiers[..idx], key, &value);
                    return Ok(Some(value));
                }
                Ok(None) => last_err = None,
                Err(e) if self.continue_on_read_err => {
                    debug!("Chain tier {} read failed, continuing: {}", idx, e);
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

impl<K, V> MGetter<K, V> for Chain<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn mget(&self, keys: &[K]) -> Result<Vec<Option<V>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        // Slots of every key in the caller's slice, built once
        let mut positions: HashMap<&K, Vec<usize>> = HashMap::with_capacity(keys.len());
        let mut pending: Vec<K> = Vec::with_capacity(keys.len());
        for (idx, key) in keys.iter().enumerate() {
            let slots = positions.entry(key).or_default();
            if slots.is_empty() {
                pending.push(key.clone());
            }
            slots.push(idx);
        }

        let mut values: Vec<Option<V>> = vec![None; keys.len()];
        let mut last_err = None;

        for (idx, tier) in self.tiers.iter().enumerate() {
            if pending.is_empty() {
                break;
            }

            let found = match tier.cache.mget(&pending) {
                Ok(found) => {
                    last_err = None;
                    found
                }
                Err(e) if self.continue_on_read_err => {
                    debug!("Chain tier {} batch read failed, continuing: {}", idx, e);
                    last_err = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut hits = HashMap::new();
            let mut missing = Vec::with_capacity(pending.len());
            let mut found = found.into_iter();
            for key in pending {
                match found.next().flatten() {
                    Some(value) => {
                        if let Some(slots) = positions.get(&key) {
                            for &slot in slots {
                                values[slot] = Some(value.clone());
                            }
                        }
                        hits.insert(key, value);
                    }
                    None => missing.push(key),
                }
            }

            debug!("Chain tier {}: {} hits, {} missing", idx, hits.len(), missing.len());
            self.promote_many(&self.tiers[..idx], &hits);
            pending = missing;
        }

        match last_err {
            Some(e) if values.iter().all(Option::is_none) => Err(e),
            _ => Ok(values),
        }
    }
}

impl<K, V> Setter<K, V> for Chain<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Write into every tier with that tier's own TTL; `_ttl` is ignored.
    fn set(&self, key: K, value: V, _ttl: Duration) -> Result<()> {
        self.fan_out(|tier| tier.cache.set(key.clone(), value.clone(), tier.ttl))
    }
}

impl<K, V> MSetter<K, V> for Chain<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    /// Write into every tier with that tier's own TTL; `_ttl` is ignored.
    fn mset(&self, kvs: HashMap<K, V>, _ttl: Duration) -> Result<()> {
        if kvs.is_empty() {
            return Ok(());
        }
        self.fan_out(|tier| tier.cache.mset(kvs.clone(), tier.ttl))
    }
}

impl<K, V> Deleter<K> for Chain<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn delete(&self, keys: &[K]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.fan_out(|tier| tier.cache.delete(keys))
    }
}
