use std::collections::{BTreeMap, HashMap};

use safepath_core::CellCoord;

/// Smallest capacity a cache will accept.
pub const MIN_CACHE_CAPACITY: usize = 64;

type PairKey = (CellCoord, CellCoord);

#[derive(Clone, Copy, Debug)]
struct Slot {
    distance: f32,
    stamp: u64,
}

/// Least-recently-used store of path distances between cell pairs.
///
/// Keys are directional: `(a, b)` and `(b, a)` are separate entries.
#[derive(Clone, Debug)]
pub struct PathDistanceCache {
    capacity: usize,
    slots: HashMap<PairKey, Slot>,
    recency: BTreeMap<u64, PairKey>,
    clock: u64,
}

impl PathDistanceCache {
    /// Creates a cache holding at least [`MIN_CACHE_CAPACITY`] entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CACHE_CAPACITY);
        Self {
            capacity,
            slots: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
            clock: 0,
        }
    }

    /// Maximum number of entries kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether an entry exists for the pair, without touching its recency.
    #[must_use]
    pub fn contains(&self, from: CellCoord, to: CellCoord) -> bool {
        self.slots.contains_key(&(from, to))
    }

    /// Returns the stored distance and marks the entry as most recently used.
    pub fn get(&mut self, from: CellCoord, to: CellCoord) -> Option<f32> {
        let stamp = self.tick();
        let slot = self.slots.get_mut(&(from, to))?;
        let _ = self.recency.remove(&slot.stamp);
        slot.stamp = stamp;
        let _ = self.recency.insert(stamp, (from, to));
        Some(slot.distance)
    }

    /// Stores a distance, evicting the least recently used entry when full.
    pub fn put(&mut self, from: CellCoord, to: CellCoord, distance: f32) {
        let key = (from, to);
        let stamp = self.tick();

        if let Some(slot) = self.slots.get_mut(&key) {
            let _ = self.recency.remove(&slot.stamp);
            *slot = Slot { distance, stamp };
            let _ = self.recency.insert(stamp, key);
            return;
        }

        if self.slots.len() >= self.capacity {
            if let Some((_, evicted)) = self.recency.pop_first() {
                let _ = self.slots.remove(&evicted);
            }
        }

        let _ = self.slots.insert(key, Slot { distance, stamp });
        let _ = self.recency.insert(stamp, key);
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.recency.clear();
    }

    fn tick(&mut self) -> u64 {
        self.clock = self.clock.wrapping_add(1);
        self.clock
    }
}

impl Default for PathDistanceCache {
    fn default() -> Self {
        Self::new(512)
    }
}
