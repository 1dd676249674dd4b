#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Default world collaborators for Safepath.
//!
//! The search systems only ever talk to the simulation through the
//! [`SpatialIndex`] and [`EntityRegistry`] traits. This crate provides the
//! deterministic implementations recommended for hosts that do not want to
//! run live collision queries: a precomputed obstacle grid with optional thin
//! walls, and an entity roster.

mod roster;
mod scatter;

use glam::Vec2;
use safepath_core::{CellBounds, CellCoord, SpatialIndex, Vec3};
use thiserror::Error;

pub use roster::EntityRoster;
pub use scatter::{EntityScatter, ObstacleScatter, ScatterError};

/// Half of the vertical probe used when testing a cell at a reference height.
const PROBE_HALF_HEIGHT: f32 = 0.5;

/// Distance between samples taken along a segment when looking for blocked cells.
const SEGMENT_SAMPLE_STEP: f32 = 0.1;

/// Segments shorter than this never count as blocked.
const MIN_SEGMENT_LENGTH: f32 = 0.001;

const COLLINEAR_EPSILON: f32 = 1e-6;

/// Static content of a single grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Obstruction {
    /// Nothing occupies the cell.
    #[default]
    Open,
    /// The cell is blocked at every height.
    Solid,
    /// The cell is blocked between two heights, inclusive of neither.
    Pillar {
        /// Lowest point of the obstacle.
        bottom: f32,
        /// Highest point of the obstacle.
        top: f32,
    },
}

impl Obstruction {
    /// Reports whether the obstruction overlaps the probe centred at `reference_height`.
    #[must_use]
    pub fn blocks_at(self, reference_height: f32) -> bool {
        match self {
            Self::Open => false,
            Self::Solid => true,
            Self::Pillar { bottom, top } => {
                reference_height - PROBE_HALF_HEIGHT < top
                    && reference_height + PROBE_HALF_HEIGHT > bottom
            }
        }
    }
}

/// Full-height wall thinner than a cell, expressed as a horizontal segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThinWall {
    from: Vec2,
    to: Vec2,
}

impl ThinWall {
    /// Creates a wall between two world points; heights are ignored.
    #[must_use]
    pub fn new(from: Vec3, to: Vec3) -> Self {
        Self {
            from: horizontal(from),
            to: horizontal(to),
        }
    }

    fn crosses(&self, from: Vec2, to: Vec2) -> bool {
        segments_intersect(from, to, self.from, self.to)
    }
}

/// Errors reported while parsing an ASCII obstacle layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridParseError {
    /// The layout contained no rows.
    #[error("obstacle layout is empty")]
    Empty,
    /// A row's width differs from the first row.
    #[error("row {row} has {found} cells but the layout is {expected} cells wide")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: usize,
        /// Width established by the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// The layout used a character other than `.` or `#`.
    #[error("unknown glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph {
        /// Character that could not be interpreted.
        glyph: char,
        /// Zero-based row of the character.
        row: usize,
        /// Zero-based column of the character.
        column: usize,
    },
}

/// Precomputed static obstacle grid backing the [`SpatialIndex`] contract.
///
/// The grid covers `columns * rows` cells starting at `origin`. Every cell
/// outside that rectangle is treated as unwalkable so searches never leave the
/// mapped area.
#[derive(Clone, Debug)]
pub struct ObstacleGrid {
    origin: CellCoord,
    columns: u32,
    rows: u32,
    cells: Vec<Obstruction>,
    walls: Vec<ThinWall>,
}

impl ObstacleGrid {
    /// Creates an empty grid anchored at `origin`.
    #[must_use]
    pub fn new(origin: CellCoord, columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            origin,
            columns,
            rows,
            cells: vec![Obstruction::Open; capacity],
            walls: Vec::new(),
        }
    }

    /// Parses a layout where `.` is open and `#` is solid.
    ///
    /// Line `i` describes row `origin.z + i` and character `j` describes column
    /// `origin.x + j`. Surrounding whitespace and blank lines are ignored.
    pub fn from_ascii(origin: CellCoord, layout: &str) -> Result<Self, GridParseError> {
        let lines: Vec<&str> = layout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = lines.first() else {
            return Err(GridParseError::Empty);
        };
        let width = first.chars().count();

        let mut solid = Vec::new();
        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(GridParseError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
            for (column, glyph) in line.chars().enumerate() {
                match glyph {
                    '.' => {}
                    '#' => solid.push((column, row)),
                    _ => return Err(GridParseError::UnknownGlyph { glyph, row, column }),
                }
            }
        }

        let columns = u32::try_from(width).unwrap_or(u32::MAX);
        let rows = u32::try_from(lines.len()).unwrap_or(u32::MAX);
        let mut grid = Self::new(origin, columns, rows);
        for (column, row) in solid {
            let cell = origin.offset(
                i32::try_from(column).unwrap_or(i32::MAX),
                i32::try_from(row).unwrap_or(i32::MAX),
            );
            grid.set(cell, Obstruction::Solid);
        }
        Ok(grid)
    }

    /// Lowest cell covered by the grid.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Provides the dimensions of the grid as `(columns, rows)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Inclusive cell rectangle covered by the grid, if it is not empty.
    #[must_use]
    pub fn bounds(&self) -> Option<CellBounds> {
        if self.columns == 0 || self.rows == 0 {
            return None;
        }
        let far = self.origin.offset(
            i32::try_from(self.columns - 1).unwrap_or(i32::MAX),
            i32::try_from(self.rows - 1).unwrap_or(i32::MAX),
        );
        Some(CellBounds::spanning(self.origin, far))
    }

    /// Obstruction stored for the cell, or `None` when it lies outside the grid.
    #[must_use]
    pub fn obstruction(&self, cell: CellCoord) -> Option<Obstruction> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Replaces the obstruction stored for a cell; cells outside the grid are ignored.
    pub fn set(&mut self, cell: CellCoord, obstruction: Obstruction) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = obstruction;
            }
        }
    }

    /// Marks the cell as blocked at every height.
    pub fn block(&mut self, cell: CellCoord) {
        self.set(cell, Obstruction::Solid);
    }

    /// Clears any obstruction stored for the cell.
    pub fn clear(&mut self, cell: CellCoord) {
        self.set(cell, Obstruction::Open);
    }

    /// Stacks `layers` unit cubes whose lowest centre sits at `base_height`.
    pub fn place_pillar(&mut self, cell: CellCoord, base_height: f32, layers: u32) {
        if layers == 0 {
            return;
        }
        self.set(
            cell,
            Obstruction::Pillar {
                bottom: base_height - 0.5,
                top: base_height + layers as f32 - 0.5,
            },
        );
    }

    /// Adds a full-height wall between two world points.
    pub fn add_wall(&mut self, from: Vec3, to: Vec3) {
        self.walls.push(ThinWall::new(from, to));
    }

    /// Thin walls registered on the grid.
    #[must_use]
    pub fn walls(&self) -> &[ThinWall] {
        &self.walls
    }

    /// Number of cells holding any obstruction.
    #[must_use]
    pub fn obstructed_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| **cell != Obstruction::Open)
            .count()
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        let column = u32::try_from(i64::from(cell.x()) - i64::from(self.origin.x())).ok()?;
        let row = u32::try_from(i64::from(cell.z()) - i64::from(self.origin.z())).ok()?;
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

impl SpatialIndex for ObstacleGrid {
    fn is_walkable(&self, cell: CellCoord, reference_height: f32) -> bool {
        self.obstruction(cell)
            .is_some_and(|obstruction| !obstruction.blocks_at(reference_height))
    }

    fn is_segment_blocked(&self, from: Vec3, to: Vec3) -> bool {
        let start = horizontal(from);
        let end = horizontal(to);
        let length = start.distance(end);
        if length < MIN_SEGMENT_LENGTH {
            return false;
        }

        if self.walls.iter().any(|wall| wall.crosses(start, end)) {
            return true;
        }

        let samples = (length / SEGMENT_SAMPLE_STEP).ceil() as u32;
        let mut previous = None;
        for sample in 0..=samples {
            let t = sample as f32 / samples as f32;
            let point = start.lerp(end, t);
            let cell = CellCoord::from_world(Vec3::new(point.x, from.y, point.y));
            if previous == Some(cell) {
                continue;
            }
            previous = Some(cell);
            if !self.is_walkable(cell, from.y) {
                return true;
            }
        }
        false
    }
}

fn horizontal(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}

fn segments_intersect(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
        return true;
    }

    (d1.abs() <= COLLINEAR_EPSILON && within_box(q1, q2, p1))
        || (d2.abs() <= COLLINEAR_EPSILON && within_box(q1, q2, p2))
        || (d3.abs() <= COLLINEAR_EPSILON && within_box(p1, p2, q1))
        || (d4.abs() <= COLLINEAR_EPSILON && within_box(p1, p2, q2))
}

fn orientation(a: Vec2, b: Vec2, point: Vec2) -> f32 {
    (b - a).perp_dot(point - a)
}

fn within_box(a: Vec2, b: Vec2, point: Vec2) -> bool {
    point.x >= a.x.min(b.x) - COLLINEAR_EPSILON
        && point.x <= a.x.max(b.x) + COLLINEAR_EPSILON
        && point.y >= a.y.min(b.y) - COLLINEAR_EPSILON
        && point.y <= a.y.max(b.y) + COLLINEAR_EPSILON
}
