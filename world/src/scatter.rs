//! Seeded generators for obstacle maps and entity placements.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use safepath_core::{Category, CellCoord, SpatialIndex, Vec3};
use thiserror::Error;

use crate::{EntityRoster, ObstacleGrid};

const PLACEMENT_ATTEMPTS: u32 = 32;

/// Errors reported while scattering entities.
#[derive(Debug, Error, PartialEq)]
pub enum ScatterError {
    /// The spread must be a finite, non-negative distance.
    #[error("spread {0} is not a finite non-negative distance")]
    InvalidSpread(f32),
}

/// Density-driven pillar placement over a rectangular area.
#[derive(Clone, Debug)]
pub struct ObstacleScatter {
    /// Lowest cell of the generated grid.
    pub origin: CellCoord,
    /// Number of columns in the generated grid.
    pub columns: u32,
    /// Number of rows in the generated grid.
    pub rows: u32,
    /// Probability that a cell receives a pillar, clamped to `[0, 1]`.
    pub density: f32,
    /// Seed for the deterministic random stream.
    pub seed: u64,
    /// Height of the centre of each pillar's lowest cube.
    pub base_height: f32,
    /// Number of unit cubes stacked per pillar.
    pub layers: u32,
}

impl Default for ObstacleScatter {
    fn default() -> Self {
        Self {
            origin: CellCoord::new(-150, -150),
            columns: 300,
            rows: 300,
            density: 0.35,
            seed: 12_345,
            base_height: 0.0,
            layers: 3,
        }
    }
}

impl ObstacleScatter {
    /// Generates the grid. The same settings always produce the same layout.
    #[must_use]
    pub fn generate(&self) -> ObstacleGrid {
        let mut grid = ObstacleGrid::new(self.origin, self.columns, self.rows);
        let density = if self.density.is_finite() {
            self.density.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        for column in 0..self.columns {
            for row in 0..self.rows {
                let roll: f32 = rng.gen();
                if roll < density {
                    let cell = self.origin.offset(
                        i32::try_from(column).unwrap_or(i32::MAX),
                        i32::try_from(row).unwrap_or(i32::MAX),
                    );
                    grid.place_pillar(cell, self.base_height, self.layers);
                }
            }
        }

        grid
    }
}

/// Places entities of several categories around per-category anchor points.
#[derive(Clone, Debug)]
pub struct EntityScatter {
    /// Anchor position for each category, such as a respawn point.
    pub anchors: Vec<(Category, Vec3)>,
    /// Number of entities to place per anchor.
    pub per_category: usize,
    /// Standard deviation of the offset from the anchor, in world units.
    pub spread: f32,
    /// Seed for the deterministic random stream.
    pub seed: u64,
}

impl EntityScatter {
    /// Registers entities on walkable cells of `grid`, returning how many were placed.
    ///
    /// Each entity gets a bounded number of attempts to land on a walkable cell;
    /// entities that fail every attempt are skipped.
    pub fn populate(
        &self,
        grid: &ObstacleGrid,
        roster: &mut EntityRoster,
    ) -> Result<usize, ScatterError> {
        if !self.spread.is_finite() || self.spread < 0.0 {
            return Err(ScatterError::InvalidSpread(self.spread));
        }
        let offsets =
            Normal::new(0.0_f32, self.spread).map_err(|_| ScatterError::InvalidSpread(self.spread))?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut placed = 0;

        for &(category, anchor) in &self.anchors {
            for _ in 0..self.per_category {
                for _ in 0..PLACEMENT_ATTEMPTS {
                    let candidate = Vec3::new(
                        anchor.x + offsets.sample(&mut rng),
                        anchor.y,
                        anchor.z + offsets.sample(&mut rng),
                    );
                    let cell = CellCoord::from_world(candidate);
                    if grid.is_walkable(cell, anchor.y) {
                        let _ = roster.register(category, cell.to_world(anchor.y));
                        placed += 1;
                        break;
                    }
                }
            }
        }

        Ok(placed)
    }
}
