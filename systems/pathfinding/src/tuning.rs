use safepath_core::CellCoord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported when tuning values cannot drive a search.
#[derive(Debug, Error, PartialEq)]
pub enum TuningError {
    /// A single value lies outside its permitted range.
    #[error("{field} is {value}, expected {expected}")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        value: f64,
        /// Human readable description of the permitted range.
        expected: &'static str,
    },
    /// A lower clamp exceeds its matching upper clamp.
    #[error("{min_field} ({min}) exceeds {max_field} ({max})")]
    InvertedRange {
        /// Name of the lower clamp.
        min_field: &'static str,
        /// Name of the upper clamp.
        max_field: &'static str,
        /// Lower clamp that was supplied.
        min: f64,
        /// Upper clamp that was supplied.
        max: f64,
    },
}

/// Knobs controlling snapping and the bounded A* search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderTuning {
    /// Largest ring radius examined when snapping start or goal onto a walkable cell.
    pub snap_radius: i32,
    /// Search radius used by requests built from this tuning.
    pub search_radius: i32,
    /// Iteration cap used by requests built from this tuning.
    pub max_iterations: usize,
    /// Cells added to the straight-line step estimate when sizing the search rectangle.
    pub adaptive_padding: i32,
    /// Smallest padding applied around the start/goal span.
    pub adaptive_min_radius: i32,
    /// Largest padding applied around the start/goal span unless a request asks for more.
    pub adaptive_max_radius: i32,
}

impl Default for PathfinderTuning {
    fn default() -> Self {
        Self {
            snap_radius: 8,
            search_radius: 64,
            max_iterations: 20_000,
            adaptive_padding: 16,
            adaptive_min_radius: 32,
            adaptive_max_radius: 256,
        }
    }
}

impl PathfinderTuning {
    /// Checks that every value can drive a search.
    pub fn validate(&self) -> Result<(), TuningError> {
        non_negative("snap_radius", self.snap_radius)?;
        positive("search_radius", i64::from(self.search_radius))?;
        positive("max_iterations", self.max_iterations as i64)?;
        non_negative("adaptive_padding", self.adaptive_padding)?;
        positive("adaptive_min_radius", i64::from(self.adaptive_min_radius))?;
        ordered(
            ("adaptive_min_radius", i64::from(self.adaptive_min_radius)),
            ("adaptive_max_radius", i64::from(self.adaptive_max_radius)),
        )
    }

    /// Padding applied around the start/goal span for a search between two cells.
    ///
    /// Grows with the straight-line distance so long queries get room to detour,
    /// while the clamp keeps memory bounded on maze-like maps.
    #[must_use]
    pub fn adaptive_radius(&self, start: CellCoord, goal: CellCoord, requested: i32) -> i32 {
        let approximate_steps = i32::try_from(start.octile_cost(goal) / 10).unwrap_or(i32::MAX);
        let ceiling = requested.max(self.adaptive_max_radius);
        approximate_steps
            .saturating_add(self.adaptive_padding)
            .clamp(self.adaptive_min_radius, ceiling.max(self.adaptive_min_radius))
    }
}

/// Knobs controlling [`crate::PathDistanceEstimator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceTuning {
    /// Number of cell pairs remembered by the distance cache.
    pub cache_capacity: usize,
    /// Cells added to the Manhattan step count when sizing the search radius.
    pub radius_padding: i32,
    /// Lower clamp of the search radius.
    pub min_radius: i32,
    /// Upper clamp of the search radius.
    pub max_radius: i32,
    /// Iterations granted per Manhattan step.
    pub iterations_per_step: usize,
    /// Lower clamp of the iteration budget.
    pub min_iterations: usize,
    /// Upper clamp of the iteration budget.
    pub max_iterations: usize,
    /// Multiplier applied to the final leg when it is obstructed.
    pub blocked_tail_penalty: f32,
    /// Scale of the surcharge added to an obstructed heuristic estimate.
    pub blocked_fallback_scale: f32,
    /// Constant surcharge added to an obstructed heuristic estimate.
    pub blocked_fallback_offset: f32,
}

impl Default for DistanceTuning {
    fn default() -> Self {
        Self {
            cache_capacity: 512,
            radius_padding: 12,
            min_radius: 24,
            max_radius: 128,
            iterations_per_step: 80,
            min_iterations: 1_500,
            max_iterations: 12_000,
            blocked_tail_penalty: 1.5,
            blocked_fallback_scale: 2.0,
            blocked_fallback_offset: 5.0,
        }
    }
}

impl DistanceTuning {
    /// Checks that every value can drive an estimate.
    pub fn validate(&self) -> Result<(), TuningError> {
        positive("cache_capacity", self.cache_capacity as i64)?;
        non_negative("radius_padding", self.radius_padding)?;
        positive("min_radius", i64::from(self.min_radius))?;
        ordered(
            ("min_radius", i64::from(self.min_radius)),
            ("max_radius", i64::from(self.max_radius)),
        )?;
        positive("iterations_per_step", self.iterations_per_step as i64)?;
        positive("min_iterations", self.min_iterations as i64)?;
        ordered(
            ("min_iterations", self.min_iterations as i64),
            ("max_iterations", self.max_iterations as i64),
        )?;
        multiplier("blocked_tail_penalty", self.blocked_tail_penalty)?;
        surcharge("blocked_fallback_scale", self.blocked_fallback_scale)?;
        surcharge("blocked_fallback_offset", self.blocked_fallback_offset)
    }

    pub(crate) fn search_radius(&self, steps: u32) -> i32 {
        i32::try_from(steps)
            .unwrap_or(i32::MAX)
            .saturating_add(self.radius_padding)
            .clamp(self.min_radius, self.max_radius)
    }

    pub(crate) fn iteration_budget(&self, steps: u32) -> usize {
        usize::try_from(steps)
            .unwrap_or(usize::MAX)
            .saturating_mul(self.iterations_per_step)
            .clamp(self.min_iterations, self.max_iterations)
    }
}

fn positive(field: &'static str, value: i64) -> Result<(), TuningError> {
    if value > 0 {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            value: value as f64,
            expected: "a positive value",
        })
    }
}

fn non_negative(field: &'static str, value: i32) -> Result<(), TuningError> {
    if value >= 0 {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            value: f64::from(value),
            expected: "zero or more",
        })
    }
}

fn ordered(min: (&'static str, i64), max: (&'static str, i64)) -> Result<(), TuningError> {
    if min.1 <= max.1 {
        Ok(())
    } else {
        Err(TuningError::InvertedRange {
            min_field: min.0,
            max_field: max.0,
            min: min.1 as f64,
            max: max.1 as f64,
        })
    }
}

fn multiplier(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value >= 1.0 {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            value: f64::from(value),
            expected: "a finite multiplier of at least 1",
        })
    }
}

fn surcharge(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            value: f64::from(value),
            expected: "a finite non-negative value",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(PathfinderTuning::default().validate(), Ok(()));
        assert_eq!(DistanceTuning::default().validate(), Ok(()));
    }

    #[test]
    fn inverted_radius_range_is_rejected() {
        let tuning = PathfinderTuning {
            adaptive_min_radius: 300,
            ..PathfinderTuning::default()
        };
        assert_eq!(
            tuning.validate(),
            Err(TuningError::InvertedRange {
                min_field: "adaptive_min_radius",
                max_field: "adaptive_max_radius",
                min: 300.0,
                max: 256.0,
            })
        );
    }

    #[test]
    fn tail_penalty_below_one_is_rejected() {
        let tuning = DistanceTuning {
            blocked_tail_penalty: 0.5,
            ..DistanceTuning::default()
        };
        assert!(matches!(
            tuning.validate(),
            Err(TuningError::OutOfRange {
                field: "blocked_tail_penalty",
                ..
            })
        ));
    }

    #[test]
    fn adaptive_radius_respects_clamps() {
        let tuning = PathfinderTuning::default();
        let origin = CellCoord::new(0, 0);

        assert_eq!(tuning.adaptive_radius(origin, CellCoord::new(3, 0), 64), 32);
        assert_eq!(tuning.adaptive_radius(origin, CellCoord::new(100, 0), 64), 116);
        assert_eq!(tuning.adaptive_radius(origin, CellCoord::new(1_000, 0), 64), 256);
        assert_eq!(
            tuning.adaptive_radius(origin, CellCoord::new(1_000, 0), 512),
            512
        );
    }

    #[test]
    fn distance_budgets_scale_with_steps() {
        let tuning = DistanceTuning::default();
        assert_eq!(tuning.search_radius(2), 24);
        assert_eq!(tuning.search_radius(40), 52);
        assert_eq!(tuning.search_radius(500), 128);
        assert_eq!(tuning.iteration_budget(2), 1_500);
        assert_eq!(tuning.iteration_budget(50), 4_000);
        assert_eq!(tuning.iteration_budget(1_000), 12_000);
    }
}
