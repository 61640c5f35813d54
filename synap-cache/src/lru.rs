use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{CacheError, Result};
use crate::traits::{Deleter, Getter, MGetter, MSetter, Setter};

/// Bounded in-memory cache combining three eviction signals:
///
/// * capacity: inserting past `capacity` drops the least recently used entry,
///   whatever its TTL or usage count
/// * usage: with `max_used > 0` an entry is served at most `max_used` times
///   after its last write
/// * TTL: expired entries are dropped when they are next read
///
/// All operations take a single exclusive lock for their whole critical
/// section, reads included, because every read mutates the recency list.
///
/// A zero TTL stores an entry that is already expired.
pub struct LruCache<K, V> {
    inner: Mutex<LruInner<K, V>>,
    capacity: usize,
    max_used: usize,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LruStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Entries dropped because they reached the usage cap
    pub exhausted: u64,
    pub entries: usize,
}

impl LruStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Node<K, V> {
    key: K,
    value: V,
    /// `None` when `now + ttl` does not fit in an `Instant`
    expires_at: Option<Instant>,
    used: usize,
    prev: Option<usize>,
    next: Option<usize>,
}

impl<K, V> Node<K, V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Slab-backed doubly linked recency list; `head` is the most recently used
struct LruInner<K, V> {
    map: HashMap<K, usize>,
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    stats: LruStats,
}

impl<K, V> LruInner<K, V>
where
    K: Eq + Hash + Clone,
{
    fn with_capacity(capacity: usize) -> Self {
        // The slab grows on demand; huge capacities should not allocate up front.
        let reserve = capacity.min(1024);
        Self {
            map: HashMap::with_capacity(reserve),
            nodes: Vec::with_capacity(reserve),
            free: Vec::new(),
            head: None,
            tail: None,
            stats: LruStats::default(),
        }
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn node(&self, idx: usize) -> &Node<K, V> {
        self.nodes[idx].as_ref().expect("linked slot is occupied")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<K, V> {
        self.nodes[idx].as_mut().expect("linked slot is occupied")
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.node_mut(h).prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    fn remove_index(&mut self, idx: usize) -> Node<K, V> {
        self.detach(idx);
        let node = self.nodes[idx].take().expect("linked slot is occupied");
        self.free.push(idx);
        self.map.remove(&node.key);
        node
    }

    fn remove_key(&mut self, key: &K) -> Option<Node<K, V>> {
        let idx = *self.map.get(key)?;
        Some(self.remove_index(idx))
    }

    fn put(&mut self, key: K, value: V, ttl: Duration, capacity: usize) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl);

        if let Some(&idx) = self.map.get(&key) {
            let node = self.node_mut(idx);
            node.value = value;
            node.used = 0;
            node.expires_at = expires_at;
            self.move_to_front(idx);
            return;
        }

        let node = Node {
            key: key.clone(),
            value,
            expires_at,
            used: 0,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                slot
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.map.insert(key, idx);
        self.push_front(idx);

        while self.len() > capacity {
            let Some(tail) = self.tail else { break };
            self.remove_index(tail);
            self.stats.evictions += 1;
            debug!("LRU EVICT (capacity {})", capacity);
        }
        self.stats.entries = self.len();
    }

    fn fetch(&mut self, key: &K, max_used: usize) -> Option<V>
    where
        V: Clone,
    {
        let Some(&idx) = self.map.get(key) else {
            self.stats.misses += 1;
            return None;
        };

        // Usage cap is checked before expiry
        if max_used > 0 {
            if self.node(idx).used >= max_used {
                self.remove_index(idx);
                self.stats.exhausted += 1;
                self.stats.misses += 1;
                self.stats.entries = self.len();
                return None;
            }
            self.node_mut(idx).used += 1;
        }

        if self.node(idx).is_expired(Instant::now()) {
            self.remove_index(idx);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            self.stats.entries = self.len();
            return None;
        }

        self.move_to_front(idx);
        self.stats.hits += 1;
        Some(self.node(idx).value.clone())
    }

    fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.stats.entries = 0;
    }
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a new LRU cache
    ///
    /// `capacity` must be greater than zero. `max_used` caps the number of
    /// reads served per write; zero means unlimited.
    pub fn new(capacity: usize, max_used: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidCapacity(capacity));
        }
        info!(
            "Initializing LRU cache with capacity={}, max_used={}",
            capacity, max_used
        );

        Ok(Self {
            inner: Mutex::new(LruInner::with_capacity(capacity)),
            capacity,
            max_used,
        })
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read cap per write, zero means unlimited
    pub fn max_used(&self) -> usize {
        self.max_used
    }

    /// Number of stored entries, expired ones included until they are read
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let count = inner.len();
        inner.clear();
        debug!("LRU CLEAR ({} entries)", count);
    }

    /// Get cache statistics
    pub fn stats(&self) -> LruStats {
        self.inner.lock().stats.clone()
    }
}

impl<K, V> Getter<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Result<Option<V>> {
        let mut inner = self.inner.lock();
        Ok(inner.fetch(key, self.max_used))
    }
}

impl<K, V> MGetter<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn mget(&self, keys: &[K]) -> Result<Vec<Option<V>>> {
        let mut inner = self.inner.lock();
        Ok(keys
            .iter()
            .map(|key| inner.fetch(key, self.max_used))
            .collect())
    }
}

impl<K, V> Setter<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Send,
{
    fn set(&self, key: K, value: V, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.put(key, value, ttl, self.capacity);
        Ok(())
    }
}

impl<K, V> MSetter<K, V> for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Send,
{
    fn mset(&self, kvs: HashMap<K, V>, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.lock();
        for (key, value) in kvs {
            inner.put(key, value, ttl, self.capacity);
        }
        Ok(())
    }
}

impl<K, V> Deleter<K> for LruCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Send,
{
    fn delete(&self, keys: &[K]) -> Result<()> {
        let mut inner = self.inner.lock();
        for key in keys {
            inner.remove_key(key);
        }
        inner.stats.entries = inner.len();
        Ok(())
    }
}
