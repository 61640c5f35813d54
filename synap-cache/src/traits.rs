//! Capability contract
//!
//! Every backend and the [`Chain`](crate::Chain) speak these traits. They are
//! kept deliberately small so a constrained backend (a read-only tier, for
//! instance) can implement only the part it supports; [`Cache`] is the full
//! contract and is implemented automatically for anything that provides all
//! of the pieces.
//!
//! Reads return `Ok(Some(v))` on a hit, `Ok(None)` on a miss and `Err(_)` when
//! the backend failed. A failure must never be reported as a miss.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// Single-key read
pub trait Getter<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Result<Option<V>>;
}

/// Single-key write; `ttl` is measured from the moment of the call
pub trait Setter<K, V>: Send + Sync {
    fn set(&self, key: K, value: V, ttl: Duration) -> Result<()>;
}

/// Batch delete
///
/// Deleting a key that does not exist succeeds. When some keys fail the
/// returned error describes every failure; callers must treat the delete as
/// best-effort.
pub trait Deleter<K>: Send + Sync {
    fn delete(&self, keys: &[K]) -> Result<()>;
}

/// Batch read
///
/// The returned vector is index-aligned with `keys`; `None` marks a miss.
pub trait MGetter<K, V>: Send + Sync {
    fn mget(&self, keys: &[K]) -> Result<Vec<Option<V>>>;
}

/// Batch write, not atomic
pub trait MSetter<K, V>: Send + Sync {
    fn mset(&self, kvs: HashMap<K, V>, ttl: Duration) -> Result<()>;
}

/// Single-key cache
pub trait SCache<K, V>: Getter<K, V> + Setter<K, V> + Deleter<K> {}

impl<K, V, T> SCache<K, V> for T where T: Getter<K, V> + Setter<K, V> + Deleter<K> + ?Sized {}

/// Batch cache
pub trait MCache<K, V>: MGetter<K, V> + MSetter<K, V> + Deleter<K> {}

impl<K, V, T> MCache<K, V> for T where T: MGetter<K, V> + MSetter<K, V> + Deleter<K> + ?Sized {}

/// Full cache contract: single and batch operations
pub trait Cache<K, V>: SCache<K, V> + MCache<K, V> {}

impl<K, V, T> Cache<K, V> for T where T: SCache<K, V> + MCache<K, V> + ?Sized {}
