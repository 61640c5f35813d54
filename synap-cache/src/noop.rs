use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use crate::error::Result;
use crate::traits::{Deleter, Getter, MGetter, MSetter, Setter};

/// Empty cache: reads always miss, writes and deletes always succeed.
///
/// Useful as a disabled tier or a default when caching is switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl<K, V> Getter<K, V> for NoCache {
    fn get(&self, _key: &K) -> Result<Option<V>> {
        Ok(None)
    }
}

impl<K, V> MGetter<K, V> for NoCache {
    fn mget(&self, keys: &[K]) -> Result<Vec<Option<V>>> {
        Ok(keys.iter().map(|_| None).collect())
    }
}

impl<K, V> Setter<K, V> for NoCache {
    fn set(&self, _key: K, _value: V, _ttl: Duration) -> Result<()> {
        Ok(())
    }
}

impl<K: Eq + Hash, V> MSetter<K, V> for NoCache {
    fn mset(&self, _kvs: HashMap<K, V>, _ttl: Duration) -> Result<()> {
        Ok(())
    }
}

impl<K> Deleter<K> for NoCache {
    fn delete(&self, _keys: &[K]) -> Result<()> {
        Ok(())
    }
}
