//! The shared node table and its bookkeeping: hash-consed node creation,
//! the internal reference stack, mark-and-sweep reclamation and table
//! resizing.  All ids handed out by the kernel are dense indices into the
//! node array; 0 and 1 are the constant sinks.

use log::debug;

use crate::cache::{triple, BddCache};
use crate::config::BddConfig;
use crate::error::BddError;
use crate::prime::{prime_gte, prime_lte};

/// Id of the constant false node.
pub(crate) const BDD_FALSE: usize = 0;
/// Id of the constant true node.
pub(crate) const BDD_TRUE: usize = 1;

/// Maximal number of variables: levels use the low 21 bits of the level
/// word, the bit above is reserved for marking.
pub(crate) const MAXVAR: usize = 0x1F_FFFF;
/// Saturation value of the reference counter; nodes at this count are
/// pinned and never reclaimed (constants and variable literals).
pub(crate) const MAXREF: usize = 0x3FF;
const MARKON: usize = 0x20_0000;
const MARKOFF: usize = 0x1F_FFFF;

/// Cache discriminator bits distinguishing quantification contexts.
pub(crate) const CACHEID_EXIST: usize = 0x0;
pub(crate) const CACHEID_APPEX: usize = 0x3;
pub(crate) const CACHEID_REPLACE: usize = 0x0;

#[derive(Debug, Clone)]
struct Node {
    refcou: usize,
    level: usize,
    /// `None` marks a free slot.
    low: Option<usize>,
    high: usize,
    /// Head of the bucket chain whose hash value is this slot's index.
    hash: usize,
    /// Next node in the bucket chain, or next free slot for free nodes.
    next: usize,
}

const fn free_node(next: usize) -> Node {
    Node { refcou: 0, level: 0, low: None, high: 0, hash: 0, next }
}

/// A point-in-time snapshot of the engine internals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BddStatistics {
    /// Number of new nodes ever produced.
    pub produced: usize,
    /// Number of allocated node slots.
    pub nodesize: usize,
    /// Number of free node slots.
    pub freenum: usize,
    /// Number of declared variables.
    pub varnum: usize,
    /// Capacity of each operation cache.
    pub cachesize: usize,
    /// Number of garbage collections so far.
    pub gbcollectnum: usize,
}

pub(crate) struct BddKernel {
    nodes: Vec<Node>,
    pub(crate) varnum: usize,
    /// Pinned literal ids: `vars[2 * i]` is the positive literal of
    /// variable `i`, `vars[2 * i + 1]` the negative one.
    pub(crate) vars: Vec<usize>,
    freepos: usize,
    freenum: usize,
    produced: usize,
    gbcollectnum: usize,
    max_nodes: usize,
    max_node_increase: usize,
    min_free_nodes: usize,
    refstack: Vec<usize>,
    pub(crate) applycache: BddCache,
    pub(crate) itecache: BddCache,
    pub(crate) quantcache: BddCache,
    pub(crate) appexcache: BddCache,
    pub(crate) replacecache: BddCache,
    /// Per-level quantification epochs: level `l` belongs to the current
    /// varset iff `quantset[l] == quantset_id`.
    pub(crate) quantset: Vec<u32>,
    pub(crate) quantset_id: u32,
    /// Deepest quantified level of the current varset.
    pub(crate) quantlast: usize,
    /// Running id source for replacers created on this engine.
    pub(crate) replacer_count: usize,
    /// Sticky error state; the first message is preserved at the tail.
    pub(crate) error: Option<BddError>,
}

impl BddKernel {
    pub(crate) fn new(varnum: usize, config: &BddConfig) -> Result<Self, BddError> {
        if varnum < 1 || varnum > MAXVAR {
            return Err(BddError::Config(format!("bad number of variables ({varnum})")));
        }
        let nodesize = prime_gte(config.node_size.max(2 * varnum + 2));
        let cachesize = config.cache_size.max(3);
        let mut nodes = Vec::with_capacity(nodesize);
        for k in 0..nodesize {
            nodes.push(free_node(k + 1));
        }
        nodes[nodesize - 1].next = 0;
        for k in [BDD_FALSE, BDD_TRUE] {
            nodes[k] = Node { refcou: MAXREF, level: varnum, low: Some(k), high: k, hash: 0, next: 0 };
        }
        let mut kernel = Self {
            nodes,
            varnum,
            vars: Vec::with_capacity(2 * varnum),
            freepos: 2,
            freenum: nodesize - 2,
            produced: 0,
            gbcollectnum: 0,
            max_nodes: config.max_nodes,
            max_node_increase: config.max_node_increase,
            min_free_nodes: config.min_free_nodes,
            refstack: Vec::with_capacity(2 * varnum + 4),
            applycache: BddCache::new(cachesize, config.cache_ratio),
            itecache: BddCache::new(cachesize, config.cache_ratio),
            quantcache: BddCache::new(cachesize, config.cache_ratio),
            appexcache: BddCache::new(cachesize, config.cache_ratio),
            replacecache: BddCache::new(cachesize, config.cache_ratio),
            quantset: vec![0; varnum],
            quantset_id: 0,
            quantlast: 0,
            replacer_count: 1,
            error: None,
        };
        for k in 0..varnum {
            let v0 = kernel.make_node(k, BDD_FALSE, BDD_TRUE)?;
            kernel.push_ref(v0);
            let v1 = kernel.make_node(k, BDD_TRUE, BDD_FALSE)?;
            kernel.pop_ref(1);
            kernel.nodes[v0].refcou = MAXREF;
            kernel.nodes[v1].refcou = MAXREF;
            kernel.vars.push(v0);
            kernel.vars.push(v1);
        }
        Ok(kernel)
    }

    // ----- node accessors --------------------------------------------------

    pub(crate) fn nodesize(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn level(&self, n: usize) -> usize {
        self.nodes[n].level
    }

    pub(crate) fn low(&self, n: usize) -> Option<usize> {
        self.nodes[n].low
    }

    pub(crate) fn high(&self, n: usize) -> usize {
        self.nodes[n].high
    }

    fn next(&self, n: usize) -> usize {
        self.nodes[n].next
    }

    fn bucket(&self, n: usize) -> usize {
        self.nodes[n].hash
    }

    /// Checks that `n` names a live node of this table.
    pub(crate) fn check_node(&self, n: usize) -> Result<(), BddError> {
        if n >= self.nodes.len() {
            return Err(BddError::Operand(format!("node id {n} out of range")));
        }
        if self.nodes[n].low.is_none() {
            return Err(BddError::Operand(format!("node id {n} points to a free slot")));
        }
        Ok(())
    }

    // ----- external reference counts ---------------------------------------

    /// Increments the external reference count of `n`, saturating at the
    /// pin sentinel.  Out-of-range or free ids are left untouched.
    pub(crate) fn inc_ref(&mut self, n: usize) {
        if n >= self.nodes.len() || self.nodes[n].low.is_none() {
            return;
        }
        if self.nodes[n].refcou < MAXREF {
            self.nodes[n].refcou += 1;
        }
    }

    /// Decrements the external reference count of `n`.  Pinned nodes and
    /// counts already at zero are left untouched.
    pub(crate) fn dec_ref(&mut self, n: usize) {
        if n >= self.nodes.len() || self.nodes[n].low.is_none() {
            return;
        }
        if self.nodes[n].refcou > 0 && self.nodes[n].refcou < MAXREF {
            self.nodes[n].refcou -= 1;
        }
    }

    // ----- internal reference stack ----------------------------------------

    pub(crate) fn init_ref(&mut self) {
        self.refstack.clear();
    }

    pub(crate) fn push_ref(&mut self, n: usize) -> usize {
        self.refstack.push(n);
        n
    }

    pub(crate) fn pop_ref(&mut self, count: usize) {
        self.refstack.truncate(self.refstack.len() - count);
    }

    // ----- unique table ----------------------------------------------------

    fn node_hash(&self, level: usize, low: usize, high: usize) -> usize {
        triple(level, low, high) % self.nodes.len()
    }

    fn ptr_hash(&self, n: usize) -> usize {
        let node = &self.nodes[n];
        triple(node.level, node.low.unwrap_or(0), node.high) % self.nodes.len()
    }

    /// Returns the canonical id for the triple `(level, low, high)`,
    /// allocating a new node on a unique-table miss.
    ///
    /// The caller guarantees `level < level(low)` and `level < level(high)`
    /// and keeps `low` and `high` protected (on the reference stack or
    /// externally referenced), since allocation may trigger a garbage
    /// collection.
    pub(crate) fn make_node(&mut self, level: usize, low: usize, high: usize) -> Result<usize, BddError> {
        if low == high {
            return Ok(low);
        }
        let mut hash = self.node_hash(level, low, high);
        let mut res = self.bucket(hash);
        while res != 0 {
            if self.nodes[res].level == level && self.nodes[res].low == Some(low) && self.nodes[res].high == high {
                return Ok(res);
            }
            res = self.next(res);
        }
        if self.freepos == 0 {
            self.gbc();
            if self.freenum * 100 <= self.nodes.len() * self.min_free_nodes {
                self.node_resize()?;
                hash = self.node_hash(level, low, high);
            }
            if self.freepos == 0 {
                return Err(BddError::Memory("no free slots left after garbage collection".to_string()));
            }
        }
        let res = self.freepos;
        self.freepos = self.next(res);
        self.freenum -= 1;
        self.produced += 1;
        let node = &mut self.nodes[res];
        node.level = level;
        node.low = Some(low);
        node.high = high;
        let chain = self.bucket(hash);
        self.nodes[res].next = chain;
        self.nodes[hash].hash = res;
        Ok(res)
    }

    /// Grows the node table towards twice its size, clamped by the
    /// per-resize increase and the total node limit, and snapped to a
    /// prime.  Rebuilds all bucket chains and the free list, and resizes
    /// (or resets) the operation caches.
    fn node_resize(&mut self) -> Result<(), BddError> {
        let oldsize = self.nodes.len();
        if self.max_nodes > 0 && oldsize >= self.max_nodes {
            return Err(BddError::Memory(format!("node table already at its maximum size ({} slots)", self.max_nodes)));
        }
        let mut nodesize = oldsize << 1;
        if self.max_node_increase > 0 && nodesize > oldsize + self.max_node_increase {
            nodesize = oldsize + self.max_node_increase;
        }
        if self.max_nodes > 0 && nodesize > self.max_nodes {
            nodesize = self.max_nodes;
        }
        let nodesize = prime_lte(nodesize);
        if nodesize <= oldsize {
            return Err(BddError::Memory(format!("cannot grow node table past {oldsize} slots")));
        }
        debug!("resizing node table: {oldsize} -> {nodesize}");
        self.nodes.reserve(nodesize - oldsize);
        for k in oldsize..nodesize {
            self.nodes.push(free_node(k + 1));
        }
        // Re-chain every live node and rebuild the free list from scratch;
        // the bucket of a node depends on the table size.
        for node in &mut self.nodes {
            node.hash = 0;
        }
        self.freepos = 0;
        self.freenum = 0;
        for n in (2..nodesize).rev() {
            if self.nodes[n].low.is_some() {
                let hash = self.ptr_hash(n);
                self.nodes[n].next = self.bucket(hash);
                self.nodes[hash].hash = n;
            } else {
                self.nodes[n].next = self.freepos;
                self.freepos = n;
                self.freenum += 1;
            }
        }
        let nodesize = self.nodes.len();
        self.applycache.resize(nodesize);
        self.itecache.resize(nodesize);
        self.quantcache.resize(nodesize);
        self.appexcache.resize(nodesize);
        self.replacecache.resize(nodesize);
        Ok(())
    }

    // ----- reclamation -----------------------------------------------------

    /// Mark-and-sweep over the node array.  Roots are the reference stack
    /// and every node with a positive reference count.  Survivors are
    /// re-chained, everything else goes onto the free list, and all
    /// operation caches are invalidated.
    pub(crate) fn gbc(&mut self) {
        if self.error.is_some() {
            return;
        }
        debug!("garbage collection: {} free of {}", self.freenum, self.nodes.len());
        for k in 0..self.refstack.len() {
            let root = self.refstack[k];
            self.mark_rec(root);
        }
        for n in 0..self.nodes.len() {
            if self.nodes[n].refcou > 0 {
                self.mark_rec(n);
            }
            self.nodes[n].hash = 0;
        }
        self.freepos = 0;
        self.freenum = 0;
        for n in (2..self.nodes.len()).rev() {
            if self.marked(n) && self.nodes[n].low.is_some() {
                self.clear_mark(n);
                let hash = self.ptr_hash(n);
                self.nodes[n].next = self.bucket(hash);
                self.nodes[hash].hash = n;
            } else {
                self.nodes[n].low = None;
                self.nodes[n].next = self.freepos;
                self.freepos = n;
                self.freenum += 1;
            }
        }
        self.applycache.reset();
        self.itecache.reset();
        self.quantcache.reset();
        self.appexcache.reset();
        self.replacecache.reset();
        self.gbcollectnum += 1;
        debug!("garbage collection done: {} free of {}", self.freenum, self.nodes.len());
    }

    // ----- mark bits -------------------------------------------------------

    pub(crate) fn marked(&self, n: usize) -> bool {
        self.nodes[n].level & MARKON != 0
    }

    pub(crate) fn set_mark(&mut self, n: usize) {
        self.nodes[n].level |= MARKON;
    }

    pub(crate) fn clear_mark(&mut self, n: usize) {
        self.nodes[n].level &= MARKOFF;
    }

    pub(crate) fn mark_rec(&mut self, n: usize) {
        if n < 2 || self.marked(n) || self.nodes[n].low.is_none() {
            return;
        }
        self.set_mark(n);
        self.mark_rec(self.nodes[n].low.unwrap());
        self.mark_rec(self.nodes[n].high);
    }

    pub(crate) fn unmark_rec(&mut self, n: usize) {
        if n < 2 || !self.marked(n) || self.nodes[n].low.is_none() {
            return;
        }
        self.clear_mark(n);
        self.unmark_rec(self.nodes[n].low.unwrap());
        self.unmark_rec(self.nodes[n].high);
    }

    pub(crate) fn unmark_all(&mut self) {
        for n in 2..self.nodes.len() {
            if self.marked(n) && self.nodes[n].low.is_some() {
                self.clear_mark(n);
            }
        }
    }

    /// Marks all nodes reachable from `n` and returns their number.
    pub(crate) fn mark_count(&mut self, n: usize) -> usize {
        if n < 2 || self.marked(n) || self.nodes[n].low.is_none() {
            return 0;
        }
        self.set_mark(n);
        1 + self.mark_count(self.nodes[n].low.unwrap()) + self.mark_count(self.nodes[n].high)
    }

    // ----- quantification varset -------------------------------------------

    /// Flattens the varset cube `n` into the per-level epoch array so that
    /// membership checks during quantification are O(1).
    pub(crate) fn quantset2cache(&mut self, n: usize) -> Result<(), BddError> {
        if n < 2 {
            return Err(BddError::Operand(format!("illegal variable set ({n})")));
        }
        self.quantset_id += 1;
        if self.quantset_id == u32::MAX {
            self.quantset = vec![0; self.varnum];
            self.quantset_id = 1;
        }
        let mut i = n;
        while i > 1 {
            let level = self.level(i);
            self.quantset[level] = self.quantset_id;
            self.quantlast = level;
            i = self.high(i);
        }
        Ok(())
    }

    pub(crate) fn in_varset(&self, level: usize) -> bool {
        self.quantset[level] == self.quantset_id
    }

    // ----- error state -----------------------------------------------------

    /// Records an error.  The first message is preserved; later failures
    /// prepend their own message and keep the earlier ones as context.
    pub(crate) fn set_error(&mut self, err: &BddError) {
        self.error = Some(match self.error.take() {
            Some(prior) => err.with_context(&prior.to_string()),
            None => err.clone(),
        });
    }

    // ----- statistics ------------------------------------------------------

    pub(crate) fn statistics(&self) -> BddStatistics {
        BddStatistics {
            produced: self.produced,
            nodesize: self.nodes.len(),
            freenum: self.freenum,
            varnum: self.varnum,
            cachesize: self.applycache.len(),
            gbcollectnum: self.gbcollectnum,
        }
    }

    #[cfg(test)]
    pub(crate) fn refcou(&self, n: usize) -> usize {
        self.nodes[n].refcou
    }
}

#[cfg(test)]
mod tests {
    use super::{BddKernel, MAXREF};
    use crate::config::BddConfig;

    #[test]
    fn test_bootstrap() {
        let kernel = BddKernel::new(5, &BddConfig::new().node_size(50).cache_size(500)).unwrap();
        let statistics = kernel.statistics();
        assert_eq!(statistics.produced, 10);
        assert_eq!(statistics.nodesize, 53);
        assert_eq!(statistics.freenum, 41);
        assert_eq!(statistics.varnum, 5);
        assert_eq!(statistics.cachesize, 503);
        assert_eq!(statistics.gbcollectnum, 0);
    }

    #[test]
    fn test_constants_are_pinned_self_loops() {
        let kernel = BddKernel::new(3, &BddConfig::new()).unwrap();
        for k in [0, 1] {
            assert_eq!(kernel.level(k), 3);
            assert_eq!(kernel.low(k), Some(k));
            assert_eq!(kernel.high(k), k);
            assert_eq!(kernel.refcou(k), MAXREF);
        }
    }

    #[test]
    fn test_literals_are_pinned() {
        let kernel = BddKernel::new(3, &BddConfig::new()).unwrap();
        for i in 0..3 {
            let pos = kernel.vars[2 * i];
            let neg = kernel.vars[2 * i + 1];
            assert_eq!(kernel.level(pos), i);
            assert_eq!((kernel.low(pos), kernel.high(pos)), (Some(0), 1));
            assert_eq!((kernel.low(neg), kernel.high(neg)), (Some(1), 0));
            assert_eq!(kernel.refcou(pos), MAXREF);
            assert_eq!(kernel.refcou(neg), MAXREF);
        }
    }

    #[test]
    fn test_make_node_is_canonical_and_reduced() {
        let mut kernel = BddKernel::new(3, &BddConfig::new()).unwrap();
        // reducedness: equal children collapse to the child
        assert_eq!(kernel.make_node(1, 4, 4).unwrap(), 4);
        // canonicity: the same triple resolves to the same id
        let a = kernel.make_node(1, 0, 1).unwrap();
        let b = kernel.make_node(1, 0, 1).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, kernel.vars[2]);
    }

    #[test]
    fn test_gbc_keeps_pinned_nodes() {
        let mut kernel = BddKernel::new(3, &BddConfig::new()).unwrap();
        kernel.init_ref();
        let produced = kernel.statistics().produced;
        // an unreferenced node disappears with the next collection
        let n = kernel.make_node(0, kernel.vars[2 * 1], kernel.vars[2 * 1 + 1]).unwrap();
        assert!(kernel.low(n).is_some());
        kernel.gbc();
        assert!(kernel.low(n).is_none());
        // all literals survive
        for i in 0..3 {
            assert!(kernel.low(kernel.vars[2 * i]).is_some());
            assert!(kernel.low(kernel.vars[2 * i + 1]).is_some());
        }
        assert_eq!(kernel.statistics().produced, produced + 1);
        assert_eq!(kernel.statistics().gbcollectnum, 1);
    }

    #[test]
    fn test_gbc_respects_refstack() {
        let mut kernel = BddKernel::new(3, &BddConfig::new()).unwrap();
        kernel.init_ref();
        let n = kernel.make_node(0, kernel.vars[2 * 1], kernel.vars[2 * 1 + 1]).unwrap();
        kernel.push_ref(n);
        kernel.gbc();
        assert!(kernel.low(n).is_some());
        kernel.pop_ref(1);
        kernel.gbc();
        assert!(kernel.low(n).is_none());
    }

    #[test]
    fn test_sticky_error_keeps_first_message() {
        let mut kernel = BddKernel::new(1, &BddConfig::new()).unwrap();
        kernel.set_error(&crate::error::BddError::Operand("first".to_string()));
        kernel.set_error(&crate::error::BddError::Operand("second".to_string()));
        let message = kernel.error.clone().unwrap().to_string();
        assert!(message.starts_with("invalid operand: second"));
        assert!(message.ends_with("prior: invalid operand: first"));
    }

    #[test]
    fn test_quantset_epoch() {
        let mut kernel = BddKernel::new(4, &BddConfig::new()).unwrap();
        // cube x1 & x3 built by hand: level 1 above level 3 above True
        kernel.init_ref();
        let inner = kernel.make_node(3, 0, 1).unwrap();
        kernel.push_ref(inner);
        let cube = kernel.make_node(1, 0, inner).unwrap();
        kernel.quantset2cache(cube).unwrap();
        assert!(!kernel.in_varset(0));
        assert!(kernel.in_varset(1));
        assert!(!kernel.in_varset(2));
        assert!(kernel.in_varset(3));
        assert_eq!(kernel.quantlast, 3);
        // a later varset invalidates the previous epoch
        let other = kernel.vars[2 * 2];
        kernel.quantset2cache(other).unwrap();
        assert!(!kernel.in_varset(1));
        assert!(kernel.in_varset(2));
    }
}
