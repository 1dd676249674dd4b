use safepath_core::{CellCoord, SpatialIndex, Vec3};

use crate::{
    DistanceTuning, PathDistanceCache, PathFinder, PathOutcome, PathRequest, PathfinderTuning,
    TuningError,
};

const COINCIDENT_EPSILON_SQUARED: f32 = 1e-4;
const MIN_DISTANCE: f32 = 0.001;

/// Branch that produced a [`DistanceEstimate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EstimateSource {
    /// Source and target occupy the same point.
    Coincident,
    /// The value came from the cache.
    Cached,
    /// The cells are neighbours, so the straight distance was used.
    Adjacent,
    /// The value is the length of a searched path.
    Searched,
    /// The search failed and the octile heuristic was used.
    Heuristic,
}

/// Travel distance between two positions together with how it was obtained.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceEstimate {
    /// Estimated travel distance in world units.
    pub value: f32,
    /// Branch that produced the value.
    pub source: EstimateSource,
}

impl DistanceEstimate {
    const fn new(value: f32, source: EstimateSource) -> Self {
        Self { value, source }
    }
}

/// Cached path-length estimates backed by a [`PathFinder`].
#[derive(Debug)]
pub struct PathDistanceEstimator {
    pathfinder: PathFinder,
    tuning: DistanceTuning,
    cache: PathDistanceCache,
}

impl PathDistanceEstimator {
    /// Creates an estimator after validating both tunings.
    pub fn new(
        pathfinder_tuning: PathfinderTuning,
        tuning: DistanceTuning,
    ) -> Result<Self, TuningError> {
        tuning.validate()?;
        let pathfinder = PathFinder::new(pathfinder_tuning)?;
        let cache = PathDistanceCache::new(tuning.cache_capacity);
        Ok(Self {
            pathfinder,
            tuning,
            cache,
        })
    }

    /// Cached distances gathered so far.
    #[must_use]
    pub fn cache(&self) -> &PathDistanceCache {
        &self.cache
    }

    /// Tuning driving the estimates.
    #[must_use]
    pub fn tuning(&self) -> &DistanceTuning {
        &self.tuning
    }

    /// Underlying pathfinder, for callers that also need full routes.
    pub fn pathfinder_mut(&mut self) -> &mut PathFinder {
        &mut self.pathfinder
    }

    /// Travel distance between two positions, in world units.
    pub fn compute_path_distance<S>(&mut self, spatial: &S, source: Vec3, target: Vec3) -> f32
    where
        S: SpatialIndex + ?Sized,
    {
        self.estimate(spatial, source, target).value
    }

    /// Travel distance between two positions along with the branch that produced it.
    ///
    /// Distances are measured on the horizontal plane. Every value other than
    /// the coincident case is cached under the `(source cell, target cell)` key.
    pub fn estimate<S>(&mut self, spatial: &S, source: Vec3, target: Vec3) -> DistanceEstimate
    where
        S: SpatialIndex + ?Sized,
    {
        if planar_distance_squared(source, target) < COINCIDENT_EPSILON_SQUARED {
            return DistanceEstimate::new(0.0, EstimateSource::Coincident);
        }

        let from = CellCoord::from_world(source);
        let to = CellCoord::from_world(target);
        if let Some(value) = self.cache.get(from, to) {
            return DistanceEstimate::new(value, EstimateSource::Cached);
        }

        let steps = from.manhattan_distance(to);
        let estimate = if steps <= 1 {
            DistanceEstimate::new(planar_distance(source, target), EstimateSource::Adjacent)
        } else {
            self.searched(spatial, source, target, steps).unwrap_or_else(|| {
                DistanceEstimate::new(
                    self.heuristic(spatial, source, target),
                    EstimateSource::Heuristic,
                )
            })
        };

        self.cache.put(from, to, estimate.value);
        estimate
    }

    fn searched<S>(
        &mut self,
        spatial: &S,
        source: Vec3,
        target: Vec3,
        steps: u32,
    ) -> Option<DistanceEstimate>
    where
        S: SpatialIndex + ?Sized,
    {
        let request = PathRequest::new(
            source,
            target,
            self.tuning.search_radius(steps),
            self.tuning.iteration_budget(steps),
        );
        let path = self.pathfinder.find_path(spatial, request);
        let waypoints = path.waypoints();
        let (first, last) = (*waypoints.first()?, *waypoints.last()?);
        if matches!(path.outcome(), PathOutcome::Partial(_)) && waypoints.len() == 1 {
            return None;
        }

        let along: f32 = waypoints
            .windows(2)
            .map(|pair| planar_distance(pair[0], pair[1]))
            .sum();
        let mut tail = planar_distance(last, target);
        if tail > 0.0 && spatial.is_segment_blocked(last, target) {
            tail *= self.tuning.blocked_tail_penalty;
        }

        let total = planar_distance(source, first) + along + tail;
        Some(DistanceEstimate::new(
            total.max(MIN_DISTANCE),
            EstimateSource::Searched,
        ))
    }

    fn heuristic<S>(&self, spatial: &S, source: Vec3, target: Vec3) -> f32
    where
        S: SpatialIndex + ?Sized,
    {
        let mut estimate =
            CellCoord::from_world(source).octile_length(CellCoord::from_world(target));
        if spatial.is_segment_blocked(source, target) {
            estimate += estimate.max(1.0) * self.tuning.blocked_fallback_scale
                + self.tuning.blocked_fallback_offset;
        }
        estimate.max(MIN_DISTANCE)
    }
}

impl Default for PathDistanceEstimator {
    fn default() -> Self {
        let tuning = DistanceTuning::default();
        Self {
            pathfinder: PathFinder::default(),
            cache: PathDistanceCache::new(tuning.cache_capacity),
            tuning,
        }
    }
}

fn planar_distance_squared(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    planar_distance_squared(a, b).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Walls {
        blocked_segments: bool,
        segment_queries: Cell<usize>,
    }

    impl SpatialIndex for Walls {
        fn is_walkable(&self, _cell: CellCoord, _reference_height: f32) -> bool {
            false
        }

        fn is_segment_blocked(&self, _from: Vec3, _to: Vec3) -> bool {
            self.segment_queries.set(self.segment_queries.get() + 1);
            self.blocked_segments
        }
    }

    #[test]
    fn stranded_search_falls_back_to_heuristic() {
        let spatial = Walls {
            blocked_segments: false,
            segment_queries: Cell::new(0),
        };
        let mut estimator = PathDistanceEstimator::default();
        let estimate = estimator.estimate(&spatial, Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0));

        assert_eq!(estimate.source, EstimateSource::Heuristic);
        let expected = 3.0 * 1.414_213_56 + 1.0;
        assert!((estimate.value - expected).abs() < 1e-4);
    }

    #[test]
    fn blocked_straight_line_adds_surcharge() {
        let spatial = Walls {
            blocked_segments: true,
            segment_queries: Cell::new(0),
        };
        let mut estimator = PathDistanceEstimator::default();
        let estimate = estimator.estimate(&spatial, Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));

        assert_eq!(estimate.source, EstimateSource::Heuristic);
        assert!((estimate.value - (4.0 + 4.0 * 2.0 + 5.0)).abs() < 1e-4);
    }

    #[test]
    fn second_query_is_served_from_cache() {
        let spatial = Walls {
            blocked_segments: true,
            segment_queries: Cell::new(0),
        };
        let mut estimator = PathDistanceEstimator::default();
        let target = Vec3::new(6.0, 0.0, 1.0);
        let first = estimator.estimate(&spatial, Vec3::ZERO, target);
        let queries = spatial.segment_queries.get();
        let second = estimator.estimate(&spatial, Vec3::ZERO, target);

        assert_eq!(second.source, EstimateSource::Cached);
        assert_eq!(second.value, first.value);
        assert_eq!(spatial.segment_queries.get(), queries);
    }

    #[test]
    fn coincident_points_are_not_cached() {
        let spatial = Walls {
            blocked_segments: false,
            segment_queries: Cell::new(0),
        };
        let mut estimator = PathDistanceEstimator::default();
        let point = Vec3::new(2.0, 0.0, 2.0);

        let estimate = estimator.estimate(&spatial, point, point + Vec3::new(0.001, 5.0, 0.0));

        assert_eq!(estimate, DistanceEstimate::new(0.0, EstimateSource::Coincident));
        assert!(estimator.cache().is_empty());
    }
}
