#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Safepath engine.
//!
//! This crate defines the vocabulary that connects the surrounding simulation,
//! the default world collaborators, and the pure search systems. The
//! simulation answers occupancy questions through [`SpatialIndex`] and exposes
//! its entities through [`EntityRegistry`]; systems discretise world positions
//! into [`CellCoord`] keys and never own simulation state themselves.

use serde::{Deserialize, Serialize};

pub use glam::Vec3;

/// Fixed-point cost of an orthogonal step (1.0 scaled by ten).
pub const ORTHOGONAL_STEP_COST: u32 = 10;

/// Fixed-point cost of a diagonal step (√2 scaled by ten and truncated).
pub const DIAGONAL_STEP_COST: u32 = 14;

/// World-space length of a diagonal step between adjacent cell centres.
pub const DIAGONAL_LENGTH: f32 = 1.414_213_56;

/// Offsets of the eight neighbours in canonical expansion order.
///
/// Orthogonal offsets precede diagonal ones so breadth-first and best-first
/// searches discover cells in a stable order.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Location of a single grid cell on the horizontal plane.
///
/// Cells are keys, never owned objects: the `x` index follows world X and the
/// `z` index follows world Z.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    z: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Column index along world X.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row index along world Z.
    #[must_use]
    pub const fn z(&self) -> i32 {
        self.z
    }

    /// Discretises a world position using round-half-up on both horizontal axes.
    #[must_use]
    pub fn from_world(position: Vec3) -> Self {
        Self {
            x: (position.x + 0.5).floor() as i32,
            z: (position.z + 0.5).floor() as i32,
        }
    }

    /// World position of the cell centre at the provided height.
    #[must_use]
    pub fn to_world(self, y: f32) -> Vec3 {
        Vec3::new(self.x as f32, y, self.z as f32)
    }

    /// Cell displaced by the provided offsets, saturating at the integer range.
    #[must_use]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            z: self.z.saturating_add(dz),
        }
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x
            .abs_diff(other.x)
            .saturating_add(self.z.abs_diff(other.z))
    }

    /// Octile distance in fixed-point step costs.
    ///
    /// Never exceeds the true cost of an 8-directional path between the cells,
    /// which keeps it admissible as an A* heuristic.
    #[must_use]
    pub fn octile_cost(self, other: CellCoord) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        let diagonal = dx.min(dz);
        let straight = dx.max(dz) - diagonal;
        diagonal
            .saturating_mul(DIAGONAL_STEP_COST)
            .saturating_add(straight.saturating_mul(ORTHOGONAL_STEP_COST))
    }

    /// Octile distance expressed in world units.
    #[must_use]
    pub fn octile_length(self, other: CellCoord) -> f32 {
        let dx = self.x.abs_diff(other.x);
        let dz = self.z.abs_diff(other.z);
        let diagonal = dx.min(dz);
        let straight = dx.max(dz) - diagonal;
        diagonal as f32 * DIAGONAL_LENGTH + straight as f32
    }
}

/// Inclusive axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellBounds {
    min: CellCoord,
    max: CellCoord,
}

impl CellBounds {
    /// Smallest rectangle that covers both cells.
    #[must_use]
    pub fn spanning(a: CellCoord, b: CellCoord) -> Self {
        Self {
            min: CellCoord::new(a.x.min(b.x), a.z.min(b.z)),
            max: CellCoord::new(a.x.max(b.x), a.z.max(b.z)),
        }
    }

    /// Smallest rectangle covering every provided cell, if any were provided.
    #[must_use]
    pub fn covering<I>(cells: I) -> Option<Self>
    where
        I: IntoIterator<Item = CellCoord>,
    {
        let mut cells = cells.into_iter();
        let first = cells.next()?;
        Some(cells.fold(Self::spanning(first, first), |bounds, cell| {
            bounds.including(cell)
        }))
    }

    /// Rectangle grown just enough to contain `cell`.
    #[must_use]
    pub fn including(self, cell: CellCoord) -> Self {
        Self {
            min: CellCoord::new(self.min.x.min(cell.x), self.min.z.min(cell.z)),
            max: CellCoord::new(self.max.x.max(cell.x), self.max.z.max(cell.z)),
        }
    }

    /// Rectangle grown by `margin` cells on every side.
    #[must_use]
    pub const fn expanded(self, margin: i32) -> Self {
        Self {
            min: self.min.offset(-margin, -margin),
            max: self.max.offset(margin, margin),
        }
    }

    /// Lower corner of the rectangle.
    #[must_use]
    pub const fn min(&self) -> CellCoord {
        self.min
    }

    /// Upper corner of the rectangle.
    #[must_use]
    pub const fn max(&self) -> CellCoord {
        self.max
    }

    /// Reports whether the cell lies inside the rectangle, edges included.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.z >= self.min.z && cell.z <= self.max.z
    }

    /// Number of cells covered by the rectangle.
    #[must_use]
    pub fn area(&self) -> u64 {
        let width = u64::from(self.max.x.abs_diff(self.min.x)) + 1;
        let depth = u64::from(self.max.z.abs_diff(self.min.z)) + 1;
        width.saturating_mul(depth)
    }
}

/// Unique identifier assigned to a tracked entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Partition of entities, such as a faction, used to decide who counts as a threat.
///
/// Assigned once when an entity is registered. Every entity whose category
/// differs from the one being evaluated is a threat to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Category(u16);

impl Category {
    /// Creates a new category with the provided numeric value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the category.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }
}

/// Snapshot of a single entity's placement reported by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Identifier allocated to the entity.
    pub id: EntityId,
    /// Category the entity belongs to.
    pub category: Category,
    /// Current world position of the entity.
    pub position: Vec3,
}

impl EntityRecord {
    /// Grid cell currently occupied by the entity.
    #[must_use]
    pub fn cell(&self) -> CellCoord {
        CellCoord::from_world(self.position)
    }
}

/// Occupancy oracle supplied by the surrounding simulation.
///
/// Implementations may be backed by live collision geometry or by a
/// precomputed obstacle grid. Answers may change between calls; systems only
/// memoise them within a single search or rebuild.
pub trait SpatialIndex {
    /// Reports whether an agent standing at `reference_height` may occupy the cell.
    fn is_walkable(&self, cell: CellCoord, reference_height: f32) -> bool;

    /// Reports whether the straight horizontal segment between two world points
    /// is obstructed, including by walls thinner than a full cell.
    fn is_segment_blocked(&self, from: Vec3, to: Vec3) -> bool;
}

impl<T> SpatialIndex for &T
where
    T: SpatialIndex + ?Sized,
{
    fn is_walkable(&self, cell: CellCoord, reference_height: f32) -> bool {
        (**self).is_walkable(cell, reference_height)
    }

    fn is_segment_blocked(&self, from: Vec3, to: Vec3) -> bool {
        (**self).is_segment_blocked(from, to)
    }
}

/// Source of entity placements consumed by periodic field rebuilds.
pub trait EntityRegistry {
    /// Appends a record for every tracked entity to `out` in a stable order.
    fn collect_entities(&self, out: &mut Vec<EntityRecord>);
}

impl EntityRegistry for [EntityRecord] {
    fn collect_entities(&self, out: &mut Vec<EntityRecord>) {
        out.extend_from_slice(self);
    }
}

impl EntityRegistry for Vec<EntityRecord> {
    fn collect_entities(&self, out: &mut Vec<EntityRecord>) {
        out.extend_from_slice(self);
    }
}
