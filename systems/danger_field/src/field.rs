use std::collections::{BTreeMap, HashMap};

use safepath_core::{Category, CellCoord};

/// Hop distances from every visited cell to the nearest threat of one category.
///
/// Only cells reached by the search are stored; a missing cell means the
/// distance is unknown, not that it is infinite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DangerField {
    category: Category,
    distances: HashMap<CellCoord, u32>,
}

impl DangerField {
    pub(crate) fn new(category: Category, distances: HashMap<CellCoord, u32>) -> Self {
        Self {
            category,
            distances,
        }
    }

    /// Category whose threats were measured.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Distance recorded for the cell, if it was visited.
    #[must_use]
    pub fn distance(&self, cell: CellCoord) -> Option<u32> {
        self.distances.get(&cell).copied()
    }

    /// Number of visited cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Whether no cell was visited, which happens when the category had no threats.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Iterates over every visited cell and its distance in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, u32)> + '_ {
        self.distances
            .iter()
            .map(|(&cell, &distance)| (cell, distance))
    }
}

/// Complete set of fields produced by one rebuild.
///
/// A set is never modified once published; newer rebuilds replace it whole.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DangerFieldSet {
    generation: u64,
    fields: BTreeMap<Category, DangerField>,
}

impl DangerFieldSet {
    pub(crate) fn new(generation: u64, fields: BTreeMap<Category, DangerField>) -> Self {
        Self { generation, fields }
    }

    /// Rebuild counter that produced this set; zero before the first publish.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Field computed for the category, if the category was present.
    #[must_use]
    pub fn field(&self, category: Category) -> Option<&DangerField> {
        self.fields.get(&category)
    }

    /// Categories that have a field, in ascending order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.fields.keys().copied()
    }

    /// Number of fields in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the set holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
