// In-memory keyed cache of trained models with least-recently-used eviction.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

/// SHA-256 of everything a cached value was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Hash the given byte sections in order. Each section is prefixed with
    /// its length, so moving bytes between sections changes the key.
    pub fn from_parts(parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&hasher.finalize());
        CacheKey(key)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Entry<V> {
    value: Arc<V>,
    last_used: u64,
}

/// Bounded map from [`CacheKey`] to shared values.
#[derive(Debug)]
pub struct KeyedCache<V> {
    capacity: usize,
    clock: u64,
    entries: HashMap<CacheKey, Entry<V>>,
}

impl<V> KeyedCache<V> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: 0,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<V>> {
        self.clock += 1;
        let now = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = now;
            Arc::clone(&entry.value)
        })
    }

    /// Insert `value`, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: CacheKey, value: V) -> Arc<V> {
        self.clock += 1;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, _)| *k);
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
            }
        }
        let value = Arc::new(value);
        self.entries.insert(
            key,
            Entry {
                value: Arc::clone(&value),
                last_used: self.clock,
            },
        );
        value
    }

    /// Cached value for `key`, or the result of `build` stored under it.
    /// The flag is true on a hit.
    pub fn get_or_insert_with<E>(
        &mut self,
        key: CacheKey,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<(Arc<V>, bool), E> {
        if let Some(hit) = self.get(&key) {
            return Ok((hit, true));
        }
        Ok((self.insert(key, build()?), false))
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> CacheKey {
        CacheKey::from_parts(&[&[n][..]])
    }

    #[test]
    fn key_depends_on_every_part() {
        let a = CacheKey::from_parts(&[&b"table"[..], &b"params"[..]]);
        assert_eq!(a, CacheKey::from_parts(&[&b"table"[..], &b"params"[..]]));
        assert_ne!(a, CacheKey::from_parts(&[&b"table"[..], &b"params2"[..]]));
        assert_ne!(a, CacheKey::from_parts(&[&b"tablep"[..], &b"arams"[..]]));
    }

    #[test]
    fn key_is_a_stable_sha256_hex_digest() {
        // SHA-256 of the 8-byte little-endian length 0 alone.
        let empty = CacheKey::from_parts(&[&b""[..]]);
        let hex = empty.to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            hex,
            "af5570f5a1810b7af78caf4bc70a660f0df51e42baf91d4de5b2328de0e83dfc"
        );
        assert_eq!(CacheKey::from_parts(&[]).to_string().len(), 64);
    }

    #[test]
    fn hit_returns_the_same_value() {
        let mut cache = KeyedCache::new(2);
        let first = cache.insert(key(1), "model".to_string());
        let hit = cache.get(&key(1)).unwrap();
        assert!(Arc::ptr_eq(&first, &hit));
        assert!(cache.get(&key(2)).is_none());
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = KeyedCache::new(2);
        cache.insert(key(1), 1);
        cache.insert(key(2), 2);
        cache.get(&key(1));
        cache.insert(key(3), 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
    }

    #[test]
    fn reinserting_a_key_does_not_evict() {
        let mut cache = KeyedCache::new(2);
        cache.insert(key(1), 1);
        cache.insert(key(2), 2);
        cache.insert(key(2), 20);
        assert_eq!(cache.len(), 2);
        assert_eq!(*cache.get(&key(2)).unwrap(), 20);
    }

    #[test]
    fn get_or_insert_with_builds_once() {
        let mut cache = KeyedCache::new(1);
        let mut builds = 0;
        let (_, hit) = cache
            .get_or_insert_with(key(7), || {
                builds += 1;
                Ok::<_, ()>(7)
            })
            .unwrap();
        assert!(!hit);
        let (value, hit) = cache
            .get_or_insert_with(key(7), || {
                builds += 1;
                Ok::<_, ()>(8)
            })
            .unwrap();
        assert!(hit);
        assert_eq!(*value, 7);
        assert_eq!(builds, 1);
    }

    #[test]
    fn failed_build_caches_nothing() {
        let mut cache: KeyedCache<u32> = KeyedCache::new(1);
        assert!(cache.get_or_insert_with(key(1), || Err("boom")).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 1);
    }
}
