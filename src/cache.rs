//! Fixed-capacity operation caches.
//!
//! Each recursive algorithm memoizes its results in an open-addressed table
//! indexed by a pairing hash of the operand ids.  Collisions overwrite the
//! previous entry; a lookup is only a hit when every key field matches.  The
//! `a` field doubles as the empty sentinel (`None`), so a reset only has to
//! clear that field.

use crate::prime::prime_gte;

/// Maps a pair of integers into a single hash value.  The caller reduces the
/// result modulo the table capacity.
pub(crate) const fn pair(a: usize, b: usize) -> usize {
    a.wrapping_add(b)
        .wrapping_mul(a.wrapping_add(b).wrapping_add(1))
        .wrapping_div(2)
        .wrapping_add(a)
}

pub(crate) const fn triple(a: usize, b: usize, c: usize) -> usize {
    pair(c, pair(a, b))
}

#[derive(Debug, Clone)]
struct BddCacheEntry {
    a: Option<usize>,
    b: usize,
    c: usize,
    res: usize,
}

#[derive(Debug)]
pub(crate) struct BddCache {
    table: Vec<BddCacheEntry>,
    /// Cache-to-node-table ratio in percent; 0 keeps the capacity fixed.
    ratio: usize,
    hits: usize,
    misses: usize,
}

impl BddCache {
    pub(crate) fn new(size: usize, ratio: usize) -> Self {
        let size = prime_gte(size);
        let empty = BddCacheEntry { a: None, b: 0, c: 0, res: 0 };
        Self { table: vec![empty; size], ratio, hits: 0, misses: 0 }
    }

    /// Invalidates all entries.
    pub(crate) fn reset(&mut self) {
        for entry in &mut self.table {
            entry.a = None;
        }
    }

    /// Grows (or shrinks) the cache in step with the node table when the
    /// ratio mode is active; plain reset otherwise.
    pub(crate) fn resize(&mut self, nodesize: usize) {
        if self.ratio > 0 {
            let size = prime_gte(nodesize * self.ratio / 100);
            let empty = BddCacheEntry { a: None, b: 0, c: 0, res: 0 };
            self.table = vec![empty; size];
        } else {
            self.reset();
        }
    }

    /// Returns the cached result for the key `(a, b, c)`, if present.
    pub(crate) fn find(&mut self, hash: usize, a: usize, b: usize, c: usize) -> Option<usize> {
        let entry = &self.table[hash % self.table.len()];
        if entry.a == Some(a) && entry.b == b && entry.c == c {
            self.hits += 1;
            Some(entry.res)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Stores a result under the key `(a, b, c)`, evicting any collision.
    pub(crate) fn store(&mut self, hash: usize, key: (usize, usize, usize), res: usize) {
        let len = self.table.len();
        let entry = &mut self.table[hash % len];
        entry.a = Some(key.0);
        entry.b = key.1;
        entry.c = key.2;
        entry.res = res;
    }

    pub(crate) const fn len(&self) -> usize {
        self.table.len()
    }

    pub(crate) const fn hits(&self) -> usize {
        self.hits
    }

    pub(crate) const fn misses(&self) -> usize {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::{pair, triple, BddCache};

    #[test]
    fn test_find_and_store() {
        let mut cache = BddCache::new(10, 0);
        assert_eq!(cache.find(7, 0, 0, 0), None);

        cache.store(triple(4, 5, 2), (4, 5, 2), 41);
        assert_eq!(cache.find(triple(4, 5, 2), 4, 5, 2), Some(41));
        // same slot, different key fields
        assert_eq!(cache.find(triple(4, 5, 2), 4, 5, 3), None);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_reset() {
        let mut cache = BddCache::new(10, 0);
        cache.store(pair(2, 9), (2, 9, 0), 17);
        assert_eq!(cache.find(pair(2, 9), 2, 9, 0), Some(17));
        cache.reset();
        assert_eq!(cache.find(pair(2, 9), 2, 9, 0), None);
    }

    #[test]
    fn test_resize_with_ratio() {
        let mut cache = BddCache::new(10, 25);
        cache.store(0, (0, 0, 0), 1);
        cache.resize(1000);
        // ratio mode reallocates: 25% of 1000, snapped to a prime
        assert_eq!(cache.len(), 251);
        assert_eq!(cache.find(0, 0, 0, 0), None);
    }

    #[test]
    fn test_resize_without_ratio() {
        let mut cache = BddCache::new(10, 0);
        let len = cache.len();
        cache.store(0, (0, 0, 0), 1);
        cache.resize(1000);
        assert_eq!(cache.len(), len);
        assert_eq!(cache.find(0, 0, 0, 0), None);
    }
}
