#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bounded grid pathfinding and cached path-distance estimates.
//!
//! [`PathFinder`] runs an 8-directional A* over the cells reported by a
//! [`SpatialIndex`], restricted to a rectangle around the start and goal. It
//! never fails: when the goal cannot be reached within the iteration budget
//! the route ends at the cell that came closest. [`PathDistanceEstimator`]
//! layers an LRU cache and a heuristic fallback on top for callers that only
//! need a travel distance.

mod cache;
mod distance;
mod search;
mod snap;
mod tuning;

use safepath_core::{CellBounds, CellCoord, SpatialIndex, Vec3};

use search::{SearchBounds, SearchScratch};

pub use cache::{PathDistanceCache, MIN_CACHE_CAPACITY};
pub use distance::{DistanceEstimate, EstimateSource, PathDistanceEstimator};
pub use snap::{nearest_walkable, Snap};
pub use tuning::{DistanceTuning, PathfinderTuning, TuningError};

/// Parameters of a single path query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathRequest {
    /// World position the agent starts from. Its height is the reference height.
    pub start: Vec3,
    /// World position the agent wants to reach.
    pub goal: Vec3,
    /// Requested padding around the start/goal span, in cells.
    pub search_radius: i32,
    /// Maximum number of heap pops before the search gives up.
    pub max_iterations: usize,
}

impl PathRequest {
    /// Creates a request with explicit limits.
    #[must_use]
    pub const fn new(start: Vec3, goal: Vec3, search_radius: i32, max_iterations: usize) -> Self {
        Self {
            start,
            goal,
            search_radius,
            max_iterations,
        }
    }
}

/// Why a search stopped short of the goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartialReason {
    /// The iteration cap was hit before the goal was expanded.
    BudgetExhausted,
    /// Every reachable cell inside the search area was expanded.
    Unreachable,
}

/// How a path relates to the requested goal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathOutcome {
    /// Start and goal share a cell after snapping.
    Coincident,
    /// The path ends on the goal cell.
    Reached,
    /// The path ends on the closest cell the search found.
    Partial(PartialReason),
}

/// Route produced by [`PathFinder::find_path`].
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    waypoints: Vec<Vec3>,
    outcome: PathOutcome,
    start_snap: Snap,
    goal_snap: Snap,
    iterations: usize,
}

impl Path {
    /// Cell centres visited in order, at the reference height.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    /// Consumes the path, returning its waypoints.
    #[must_use]
    pub fn into_waypoints(self) -> Vec<Vec3> {
        self.waypoints
    }

    /// Whether the goal was reached.
    #[must_use]
    pub const fn outcome(&self) -> PathOutcome {
        self.outcome
    }

    /// How the start position was mapped onto a walkable cell.
    #[must_use]
    pub const fn start_snap(&self) -> Snap {
        self.start_snap
    }

    /// How the goal position was mapped onto a walkable cell.
    #[must_use]
    pub const fn goal_snap(&self) -> Snap {
        self.goal_snap
    }

    /// Heap pops spent by the search.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    /// Sum of the straight segments between consecutive waypoints.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.waypoints
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum()
    }
}

/// Reusable A* pathfinder over a [`SpatialIndex`].
#[derive(Debug)]
pub struct PathFinder {
    tuning: PathfinderTuning,
    scratch: SearchScratch,
}

impl PathFinder {
    /// Creates a pathfinder after validating the tuning.
    pub fn new(tuning: PathfinderTuning) -> Result<Self, TuningError> {
        tuning.validate()?;
        Ok(Self {
            tuning,
            scratch: SearchScratch::default(),
        })
    }

    /// Tuning driving this pathfinder.
    #[must_use]
    pub fn tuning(&self) -> &PathfinderTuning {
        &self.tuning
    }

    /// Builds a request using the configured search radius and iteration cap.
    #[must_use]
    pub fn request(&self, start: Vec3, goal: Vec3) -> PathRequest {
        PathRequest::new(
            start,
            goal,
            self.tuning.search_radius,
            self.tuning.max_iterations,
        )
    }

    /// Finds a route between the request's endpoints.
    ///
    /// Always returns at least one waypoint. Occupancy answers are memoised
    /// for the duration of this call only.
    pub fn find_path<S>(&mut self, spatial: &S, request: PathRequest) -> Path
    where
        S: SpatialIndex + ?Sized,
    {
        let height = request.start.y;
        self.scratch.memo.reset();

        let start_snap = self.snap(spatial, CellCoord::from_world(request.start), height);
        let goal_snap = self.snap(spatial, CellCoord::from_world(request.goal), height);
        let start = start_snap.cell();
        let goal = goal_snap.cell();

        if start == goal {
            return Path {
                waypoints: vec![start.to_world(height)],
                outcome: PathOutcome::Coincident,
                start_snap,
                goal_snap,
                iterations: 0,
            };
        }

        let radius = self
            .tuning
            .adaptive_radius(start, goal, request.search_radius);
        let result = self.scratch.run(
            spatial,
            SearchBounds {
                start,
                goal,
                area: CellBounds::spanning(start, goal).expanded(radius),
                height,
                max_iterations: request.max_iterations,
            },
        );

        let waypoints = self
            .scratch
            .trace(result.end)
            .into_iter()
            .map(|cell| cell.to_world(height))
            .collect();

        Path {
            waypoints,
            outcome: result.outcome,
            start_snap,
            goal_snap,
            iterations: result.iterations,
        }
    }

    fn snap<S>(&mut self, spatial: &S, cell: CellCoord, height: f32) -> Snap
    where
        S: SpatialIndex + ?Sized,
    {
        let memo = &mut self.scratch.memo;
        let snap = nearest_walkable(cell, self.tuning.snap_radius, |candidate| {
            memo.is_walkable(spatial, candidate, height)
        });
        if let Snap::Unresolved(original) = snap {
            log::debug!(
                "no walkable cell within {} rings of {original:?}; searching from it anyway",
                self.tuning.snap_radius
            );
        }
        snap
    }
}

impl Default for PathFinder {
    fn default() -> Self {
        Self {
            tuning: PathfinderTuning::default(),
            scratch: SearchScratch::default(),
        }
    }
}
