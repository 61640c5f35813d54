use std::collections::HashMap;
use std::hash::Hash;

use crate::error::Result;
use crate::traits::MGetter;

/// Batch read returning an [`MGetResult`] instead of a bare vector
pub fn mget<K, V, C>(cache: &C, keys: &[K]) -> Result<MGetResult<K, V>>
where
    K: Clone,
    C: MGetter<K, V> + ?Sized,
{
    let values = cache.mget(keys)?;
    Ok(MGetResult::new(keys.to_vec(), values))
}

/// Outcome of a batch read, with helpers to split hits from misses
///
/// Keys and values are index-aligned and never change after
/// construction.
#[derive(Debug, Clone)]
pub struct MGetResult<K, V> {
    keys: Vec<K>,
    values: Vec<Option<V>>,
}

impl<K, V> MGetResult<K, V> {
    /// Pair `keys` with the values a batch read returned for them.
    ///
    /// A short `values` vector is padded with misses.
    pub fn new(keys: Vec<K>, mut values: Vec<Option<V>>) -> Self {
        values.resize_with(keys.len(), || None);
        Self { keys, values }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// `(key, value)` pairs in request order; `None` marks a miss
    pub fn iter(&self) -> impl Iterator<Item = (&K, Option<&V>)> {
        self.keys.iter().zip(self.values.iter().map(Option::as_ref))
    }

    /// Visit every entry until `f` returns `false`
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&K, Option<&V>) -> bool,
    {
        for (key, value) in self.iter() {
            if !f(key, value) {
                return;
            }
        }
    }

    /// Visit hits only until `f` returns `false`
    pub fn range_hit<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        for (key, value) in self.iter() {
            if let Some(value) = value {
                if !f(key, value) {
                    return;
                }
            }
        }
    }

    /// Visit misses only until `f` returns `false`
    pub fn range_miss<F>(&self, mut f: F)
    where
        F: FnMut(&K) -> bool,
    {
        for (key, value) in self.iter() {
            if value.is_none() && !f(key) {
                return;
            }
        }
    }
}

impl<K: Clone, V> MGetResult<K, V> {
    pub fn hit_keys(&self) -> Vec<K> {
        let mut result = Vec::with_capacity(self.keys.len());
        self.range_hit(|key, _| {
            result.push(key.clone());
            true
        });
        result
    }

    pub fn miss_keys(&self) -> Vec<K> {
        let mut result = Vec::with_capacity(self.keys.len());
        self.range_miss(|key| {
            result.push(key.clone());
            true
        });
        result
    }

    /// Hit keys and miss keys, in request order
    pub fn hit_miss_keys(&self) -> (Vec<K>, Vec<K>) {
        let mut hit = Vec::with_capacity(self.keys.len());
        let mut miss = Vec::with_capacity(self.keys.len());
        for (key, value) in self.iter() {
            if value.is_some() {
                hit.push(key.clone());
            } else {
                miss.push(key.clone());
            }
        }
        (hit, miss)
    }
}

impl<K, V> MGetResult<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn hit_map_values(&self) -> HashMap<K, V> {
        let mut result = HashMap::with_capacity(self.keys.len());
        self.range_hit(|key, value| {
            result.insert(key.clone(), value.clone());
            true
        });
        result
    }
}
