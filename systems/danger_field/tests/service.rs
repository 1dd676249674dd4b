use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use safepath_core::{Category, CellCoord, Vec3};
use safepath_system_danger_field::{
    BuildProgress, DangerFieldService, DangerFieldTuning, RebuildRequest, ScoreLookup,
};
use safepath_world::{EntityRoster, ObstacleGrid, ObstacleScatter};

const RED: Category = Category::new(0);
const BLUE: Category = Category::new(1);

fn at(x: i32, z: i32) -> Vec3 {
    CellCoord::new(x, z).to_world(0.0)
}

fn service(tuning: DangerFieldTuning) -> DangerFieldService {
    DangerFieldService::new(tuning).expect("valid tuning")
}

fn publish(service: &mut DangerFieldService, map: &ObstacleGrid, roster: &EntityRoster) -> u64 {
    assert_eq!(service.trigger_rebuild(roster), RebuildRequest::Started);
    for _ in 0..10_000 {
        if let BuildProgress::Published { generation } = service.step(map) {
            return generation;
        }
    }
    panic!("rebuild did not publish");
}

#[test]
fn queries_before_first_publish_use_neutral_score() {
    let service = service(DangerFieldTuning::default());

    assert!(!service.is_ready());
    assert_eq!(service.lookup(RED, at(3, 3)), ScoreLookup::Fallback(50));
    assert_eq!(service.query(BLUE, at(-7, 2)), 50);
    assert_eq!(service.snapshot().generation(), 0);
}

#[test]
fn open_grid_distances_count_hops() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 5, 5);
    let mut roster = EntityRoster::new();
    let _ = roster.register(RED, at(0, 0));
    let _ = roster.register(BLUE, at(4, 4));
    let mut service = service(DangerFieldTuning::default());

    assert_eq!(publish(&mut service, &map, &roster), 1);

    assert!(service.is_ready());
    assert_eq!(service.lookup(BLUE, at(0, 0)), ScoreLookup::Measured(0));
    assert_eq!(service.lookup(BLUE, at(1, 1)), ScoreLookup::Measured(1));
    assert_eq!(service.lookup(BLUE, at(1, 0)), ScoreLookup::Measured(1));
    assert_eq!(service.lookup(BLUE, at(4, 4)), ScoreLookup::Measured(4));
    assert_eq!(service.lookup(RED, at(0, 0)), ScoreLookup::Measured(4));
    assert_eq!(service.lookup(RED, at(4, 2)), ScoreLookup::Measured(2));
}

#[test]
fn walls_lengthen_distances() {
    let map = ObstacleGrid::from_ascii(
        CellCoord::new(0, 0),
        "
        .....
        ####.
        .....
        ",
    )
    .expect("valid layout");
    let mut roster = EntityRoster::new();
    let _ = roster.register(BLUE, at(0, 0));
    let _ = roster.register(RED, at(0, 2));
    let mut service = service(DangerFieldTuning::default());

    let _ = publish(&mut service, &map, &roster);

    assert_eq!(service.query(RED, at(4, 1)), 4);
    assert_eq!(service.query(RED, at(0, 2)), 8);
    assert_eq!(
        service.lookup(RED, at(0, 1)),
        ScoreLookup::Fallback(50),
        "blocked cells are never visited"
    );
}

#[test]
fn obstacle_changes_between_rebuilds_are_observed() {
    let mut map = ObstacleGrid::new(CellCoord::new(0, 0), 5, 1);
    let mut roster = EntityRoster::new();
    let _ = roster.register(RED, at(0, 0));
    let _ = roster.register(BLUE, at(4, 0));
    let mut service = service(DangerFieldTuning::default());

    let _ = publish(&mut service, &map, &roster);
    assert_eq!(service.lookup(BLUE, at(4, 0)), ScoreLookup::Measured(4));

    map.block(CellCoord::new(2, 0));
    let _ = publish(&mut service, &map, &roster);
    assert_eq!(service.lookup(BLUE, at(1, 0)), ScoreLookup::Measured(1));
    assert_eq!(service.lookup(BLUE, at(4, 0)), ScoreLookup::Fallback(50));

    map.clear(CellCoord::new(2, 0));
    assert_eq!(publish(&mut service, &map, &roster), 3);
    assert_eq!(service.lookup(BLUE, at(4, 0)), ScoreLookup::Measured(4));
}

#[test]
fn cells_outside_search_bounds_fall_back() {
    let map = ObstacleGrid::new(CellCoord::new(-50, -50), 100, 100);
    let mut roster = EntityRoster::new();
    let _ = roster.register(RED, at(0, 0));
    let _ = roster.register(BLUE, at(2, 0));
    let mut service = service(DangerFieldTuning {
        bounds_margin: 3,
        ..DangerFieldTuning::default()
    });

    let _ = publish(&mut service, &map, &roster);

    assert_eq!(service.lookup(RED, at(-3, 0)), ScoreLookup::Measured(5));
    assert_eq!(service.lookup(RED, at(-4, 0)), ScoreLookup::Fallback(50));
    assert_eq!(
        service.lookup(Category::new(9), at(0, 0)),
        ScoreLookup::Fallback(50)
    );
}

#[test]
fn scores_are_clamped_to_ceiling() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 12, 1);
    let mut roster = EntityRoster::new();
    let _ = roster.register(RED, at(11, 0));
    let _ = roster.register(BLUE, at(0, 0));

    let mut capped = service(DangerFieldTuning {
        score_ceiling: Some(5),
        neutral_score: 2,
        ..DangerFieldTuning::default()
    });
    let _ = publish(&mut capped, &map, &roster);
    assert_eq!(capped.lookup(RED, at(11, 0)), ScoreLookup::Measured(5));
    assert_eq!(capped.lookup(RED, at(3, 0)), ScoreLookup::Measured(3));

    let mut raw = service(DangerFieldTuning {
        score_ceiling: None,
        ..DangerFieldTuning::default()
    });
    let _ = publish(&mut raw, &map, &roster);
    assert_eq!(raw.query(RED, at(11, 0)), 11);
}

#[test]
fn rebuild_is_chunked_and_published_atomically() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 3, 2);
    let mut roster = EntityRoster::new();
    let _ = roster.register(RED, at(0, 0));
    let _ = roster.register(BLUE, at(2, 1));
    let mut service = service(DangerFieldTuning {
        nodes_per_step: 4,
        ..DangerFieldTuning::default()
    });

    assert_eq!(service.trigger_rebuild(&roster), RebuildRequest::Started);
    assert_eq!(
        service.step(&map),
        BuildProgress::Suspended { processed: 4 }
    );
    assert!(!service.is_ready());
    assert_eq!(service.query(RED, at(1, 1)), 50);

    assert_eq!(
        service.step(&map),
        BuildProgress::Suspended { processed: 4 }
    );
    assert!(!service.is_ready());

    assert_eq!(
        service.step(&map),
        BuildProgress::Published { generation: 1 }
    );
    assert!(service.is_ready());
    assert!(!service.is_rebuilding());
    assert_eq!(service.query(RED, at(1, 1)), 1);
    assert_eq!(service.step(&map), BuildProgress::Idle);
}

#[test]
fn trigger_during_rebuild_is_ignored() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 3, 2);
    let mut roster = EntityRoster::new();
    let _ = roster.register(RED, at(0, 0));
    let _ = roster.register(BLUE, at(2, 1));
    let mut service = service(DangerFieldTuning {
        nodes_per_step: 4,
        ..DangerFieldTuning::default()
    });

    assert_eq!(service.trigger_rebuild(&roster), RebuildRequest::Started);
    let _ = service.step(&map);
    assert!(service.is_rebuilding());
    assert_eq!(
        service.trigger_rebuild(&roster),
        RebuildRequest::AlreadyRunning
    );

    let _ = service.step(&map);
    assert_eq!(
        service.step(&map),
        BuildProgress::Published { generation: 1 }
    );
}

#[test]
fn snapshot_holders_keep_their_generation() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 8, 8);
    let mut roster = EntityRoster::new();
    let _ = roster.register(RED, at(0, 0));
    let blue = roster.register(BLUE, at(7, 0));
    let mut service = service(DangerFieldTuning::default());

    let _ = publish(&mut service, &map, &roster);
    let first = service.snapshot();

    assert!(roster.relocate(blue, at(1, 0)));
    assert_eq!(publish(&mut service, &map, &roster), 2);
    let second = service.snapshot();

    let red_field = |set: &safepath_system_danger_field::DangerFieldSet| {
        set.field(RED)
            .and_then(|field| field.distance(CellCoord::new(0, 0)))
    };
    assert_eq!(first.generation(), 1);
    assert_eq!(red_field(&*first), Some(7));
    assert_eq!(second.generation(), 2);
    assert_eq!(red_field(&*second), Some(1));
}

#[test]
fn removed_categories_disappear_from_next_set() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 6, 6);
    let mut roster = EntityRoster::new();
    let _ = roster.register(RED, at(0, 0));
    let blue = roster.register(BLUE, at(5, 5));
    let mut service = service(DangerFieldTuning::default());

    let _ = publish(&mut service, &map, &roster);
    assert!(service.snapshot().field(BLUE).is_some());

    assert!(roster.unregister(blue).is_some());
    let _ = publish(&mut service, &map, &roster);

    let set = service.snapshot();
    assert!(set.field(BLUE).is_none());
    assert!(set.field(RED).is_some_and(|field| field.is_empty()));
    assert_eq!(service.lookup(RED, at(0, 0)), ScoreLookup::Fallback(50));
}

#[test]
fn timer_triggers_rebuilds_on_interval() {
    let map = ObstacleGrid::new(CellCoord::new(0, 0), 4, 4);
    let mut roster = EntityRoster::new();
    let _ = roster.register(RED, at(0, 0));
    let _ = roster.register(BLUE, at(3, 3));
    let mut service = service(DangerFieldTuning::default());

    assert_eq!(
        service.advance(Duration::ZERO, &map, &roster),
        BuildProgress::Published { generation: 1 }
    );
    assert_eq!(
        service.advance(Duration::from_secs(1), &map, &roster),
        BuildProgress::Idle
    );
    assert_eq!(
        service.advance(Duration::from_millis(3_999), &map, &roster),
        BuildProgress::Idle
    );
    assert_eq!(
        service.advance(Duration::from_millis(1), &map, &roster),
        BuildProgress::Published { generation: 2 }
    );
}

fn replay_fingerprint() -> u64 {
    let map = ObstacleScatter {
        origin: CellCoord::new(-24, -24),
        columns: 48,
        rows: 48,
        density: 0.2,
        seed: 31,
        ..ObstacleScatter::default()
    }
    .generate();
    let mut roster = EntityRoster::new();
    let mut ids = Vec::new();
    for index in 0..6 {
        let category = Category::new(index % 3);
        ids.push(roster.register(category, at(-20 + index as i32 * 7, 15 - index as i32 * 5)));
    }
    let mut service = service(DangerFieldTuning {
        nodes_per_step: 97,
        ..DangerFieldTuning::default()
    });
    let mut hasher = DefaultHasher::new();

    for tick in 0..400_u32 {
        if tick % 100 == 50 {
            let id = ids[(tick / 100) as usize % ids.len()];
            let _ = roster.relocate(id, at((tick % 17) as i32 - 8, 3));
        }
        let progress = service.advance(Duration::from_millis(50), &map, &roster);
        progress.hash(&mut hasher);
    }

    let set = service.snapshot();
    set.generation().hash(&mut hasher);
    for category in set.categories() {
        for x in -24..24 {
            for z in -24..24 {
                service
                    .lookup(category, at(x, z))
                    .hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

#[test]
fn replay_is_deterministic() {
    assert_eq!(replay_fingerprint(), replay_fingerprint());
}
