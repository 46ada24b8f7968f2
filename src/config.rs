/// Tuning parameters for a [`Bdd`][crate::Bdd] engine.
///
/// ```
/// use robdd::{Bdd, BddConfig};
///
/// let config = BddConfig::new().node_size(10_000).cache_size(3_000).cache_ratio(25);
/// let bdd = Bdd::with_config(6, &config).unwrap();
/// assert_eq!(bdd.varnum(), 6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BddConfig {
    /// Initial number of slots in the node table.  The engine never goes
    /// below the room needed for the constants and all variable literals.
    pub(crate) node_size: usize,
    /// Initial number of entries in each operation cache.
    pub(crate) cache_size: usize,
    /// Cache-to-node-table ratio in percent.  With a ratio of `r` the caches
    /// are re-allocated to `r` entries per 100 node slots whenever the node
    /// table grows; 0 keeps the cache capacity fixed.
    pub(crate) cache_ratio: usize,
    /// Upper bound on the node table size; 0 means unlimited.
    pub(crate) max_nodes: usize,
    /// Upper bound on the number of slots added by a single resize; 0 means
    /// unlimited.
    pub(crate) max_node_increase: usize,
    /// Minimal percentage of free slots that must be left after a garbage
    /// collection; below it the table is resized.
    pub(crate) min_free_nodes: usize,
}

impl BddConfig {
    /// Constructs the default configuration.
    pub const fn new() -> Self {
        Self {
            node_size: 0,
            cache_size: 10_000,
            cache_ratio: 0,
            max_nodes: 0,
            max_node_increase: 1 << 20,
            min_free_nodes: 20,
        }
    }

    /// Sets the initial node table size.
    #[must_use]
    pub const fn node_size(mut self, size: usize) -> Self {
        self.node_size = size;
        self
    }

    /// Sets the initial operation cache size.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Sets the cache-to-node-table ratio in percent (0 = fixed caches).
    #[must_use]
    pub const fn cache_ratio(mut self, ratio: usize) -> Self {
        self.cache_ratio = ratio;
        self
    }

    /// Sets the maximum node table size (0 = unlimited).
    #[must_use]
    pub const fn max_nodes(mut self, size: usize) -> Self {
        self.max_nodes = size;
        self
    }

    /// Sets the maximum growth per resize (0 = unlimited).
    #[must_use]
    pub const fn max_node_increase(mut self, size: usize) -> Self {
        self.max_node_increase = size;
        self
    }

    /// Sets the minimal percentage of free slots after a garbage collection.
    #[must_use]
    pub const fn min_free_nodes(mut self, ratio: usize) -> Self {
        self.min_free_nodes = ratio;
        self
    }
}

impl Default for BddConfig {
    fn default() -> Self {
        Self::new()
    }
}
