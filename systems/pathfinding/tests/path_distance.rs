use approx::assert_relative_eq;
use safepath_core::{CellCoord, Vec3};
use safepath_system_pathfinding::{
    DistanceTuning, EstimateSource, PathDistanceCache, PathDistanceEstimator, PathfinderTuning,
};
use safepath_world::ObstacleGrid;

fn grid(layout: &str) -> ObstacleGrid {
    ObstacleGrid::from_ascii(CellCoord::new(0, 0), layout).expect("valid layout")
}

fn at(x: i32, z: i32) -> Vec3 {
    CellCoord::new(x, z).to_world(0.0)
}

#[test]
fn same_point_has_zero_distance() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 4, 4);
    let mut estimator = PathDistanceEstimator::default();

    assert_eq!(estimator.compute_path_distance(&map, at(2, 2), at(2, 2)), 0.0);
    assert!(estimator.cache().is_empty());
}

#[test]
fn adjacent_cells_use_straight_distance() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 4, 4);
    let mut estimator = PathDistanceEstimator::default();
    let source = Vec3::new(0.0, 0.0, 0.0);
    let target = Vec3::new(1.0, 0.0, 0.3);

    let first = estimator.estimate(&map, source, target);
    assert_eq!(first.source, EstimateSource::Adjacent);
    assert_relative_eq!(first.value, 1.09_f32.sqrt(), epsilon = 1e-5);

    let second = estimator.estimate(&map, source, target);
    assert_eq!(second.source, EstimateSource::Cached);
    assert_eq!(second.value, first.value);
}

#[test]
fn winding_corridor_distance_is_symmetric() {
    let map = grid(
        "
        #######
        #.....#
        #####.#
        #.....#
        #######
        ",
    );
    let mut estimator = PathDistanceEstimator::default();

    let forward = estimator.estimate(&map, at(1, 1), at(1, 3));
    let backward = estimator.estimate(&map, at(1, 3), at(1, 1));

    assert_eq!(forward.source, EstimateSource::Searched);
    assert_eq!(backward.source, EstimateSource::Searched);
    assert_relative_eq!(forward.value, 10.0, epsilon = 1e-3);
    assert_relative_eq!(forward.value, backward.value, epsilon = 1e-3);
}

#[test]
fn open_field_distance_is_symmetric() {
    let map = ObstacleGrid::new(CellCoord::new(-2, -2), 12, 12);
    let mut estimator = PathDistanceEstimator::default();

    let forward = estimator.compute_path_distance(&map, at(0, 0), at(5, 2));
    let backward = estimator.compute_path_distance(&map, at(5, 2), at(0, 0));

    assert_relative_eq!(forward, 3.0 + 2.0 * 1.414_213_56, epsilon = 1e-3);
    assert_relative_eq!(forward, backward, epsilon = 1e-3);
}

#[test]
fn enclosed_target_penalises_blocked_tail() {
    let map = grid(
        "
        .......
        ....###
        ....#.#
        ....###
        ",
    );
    let mut estimator = PathDistanceEstimator::default();
    let source = at(0, 0);
    let target = at(5, 2);

    let estimate = estimator.estimate(&map, source, target);

    assert_eq!(estimate.source, EstimateSource::Searched);
    assert!(estimate.value > CellCoord::new(0, 0).octile_length(CellCoord::new(5, 2)));
}

#[test]
fn stranded_source_falls_back_to_penalised_heuristic() {
    let map = grid(
        "
        .#...
        ##...
        .....
        ",
    );
    let mut estimator = PathDistanceEstimator::default();

    let estimate = estimator.estimate(&map, at(0, 0), at(4, 0));

    assert_eq!(estimate.source, EstimateSource::Heuristic);
    assert_relative_eq!(estimate.value, 4.0 + 4.0 * 2.0 + 5.0, epsilon = 1e-4);
}

#[test]
fn positions_far_outside_the_map_still_get_a_distance() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 8, 8);
    let mut estimator = PathDistanceEstimator::default();
    let source = Vec3::new(-3.0e9, 0.0, 0.0);
    let target = Vec3::new(3.0e9, 0.0, 5.0);

    let estimate = estimator.estimate(&map, source, target);

    assert_eq!(estimate.source, EstimateSource::Heuristic);
    assert!(estimate.value.is_finite());
    assert!(estimate.value >= u32::MAX as f32);
    assert_eq!(
        estimator.compute_path_distance(&map, source, target),
        estimate.value
    );
}

#[test]
fn cache_evicts_least_recently_used_pair() {
    let mut cache = PathDistanceCache::new(64);
    for x in 0..64 {
        cache.put(CellCoord::new(x, 0), CellCoord::new(x, 1), x as f32);
    }
    assert_eq!(
        cache.get(CellCoord::new(5, 0), CellCoord::new(5, 1)),
        Some(5.0)
    );

    cache.put(CellCoord::new(99, 0), CellCoord::new(99, 1), 99.0);

    assert_eq!(cache.get(CellCoord::new(0, 0), CellCoord::new(0, 1)), None);
    assert_eq!(
        cache.get(CellCoord::new(5, 0), CellCoord::new(5, 1)),
        Some(5.0)
    );
    assert_eq!(
        cache.get(CellCoord::new(99, 0), CellCoord::new(99, 1)),
        Some(99.0)
    );
    assert_eq!(cache.len(), 64);
}

#[test]
fn small_capacity_requests_are_raised() {
    let estimator = PathDistanceEstimator::new(
        PathfinderTuning::default(),
        DistanceTuning {
            cache_capacity: 8,
            ..DistanceTuning::default()
        },
    )
    .expect("valid tuning");

    assert_eq!(estimator.cache().capacity(), 64);
}

#[test]
fn invalid_tuning_is_rejected() {
    let result = PathDistanceEstimator::new(
        PathfinderTuning::default(),
        DistanceTuning {
            min_iterations: 20_000,
            ..DistanceTuning::default()
        },
    );

    assert!(result.is_err());
}
