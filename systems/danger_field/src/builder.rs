//! Resumable multi-source breadth-first search producing [`DangerFieldSet`]s.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque},
    sync::Arc,
};

use safepath_core::{
    Category, CellBounds, CellCoord, EntityRecord, EntityRegistry, SpatialIndex,
    NEIGHBOR_OFFSETS,
};

use crate::{DangerField, DangerFieldSet};

/// Answer to a rebuild trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RebuildRequest {
    /// A new rebuild was queued and will advance on the next step.
    Started,
    /// A rebuild is already in flight; the trigger was ignored.
    AlreadyRunning,
}

/// State reported after a builder step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildProgress {
    /// No rebuild is in flight.
    Idle,
    /// The step budget ran out; the rebuild resumes on the next step.
    Suspended {
        /// Frontier cells processed during this step.
        processed: usize,
    },
    /// Every category finished and a new set replaced the previous one.
    Published {
        /// Generation of the newly published set.
        generation: u64,
    },
}

#[derive(Debug)]
struct CategoryPass {
    category: Category,
    height: f32,
    frontier: VecDeque<CellCoord>,
    distances: HashMap<CellCoord, u32>,
}

#[derive(Debug)]
struct Rebuild {
    bounds: Option<CellBounds>,
    entities: Vec<EntityRecord>,
    pending: VecDeque<Category>,
    current: Option<CategoryPass>,
    finished: BTreeMap<Category, DangerField>,
    walkable: HashMap<(CellCoord, u32), bool>,
}

impl Rebuild {
    fn new(entities: Vec<EntityRecord>, margin: i32) -> Self {
        let bounds =
            CellBounds::covering(entities.iter().map(EntityRecord::cell)).map(|b| b.expanded(margin));
        let pending = entities
            .iter()
            .map(|entity| entity.category)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            bounds,
            entities,
            pending,
            current: None,
            finished: BTreeMap::new(),
            walkable: HashMap::new(),
        }
    }

    fn seed(&self, category: Category) -> CategoryPass {
        let threats = self
            .entities
            .iter()
            .filter(|entity| entity.category != category);
        let height = threats.clone().last().map_or(0.0, |entity| entity.position.y);

        let mut frontier = VecDeque::new();
        let mut distances = HashMap::new();
        let mut seen = HashSet::new();
        for threat in threats {
            let cell = threat.cell();
            if seen.insert(cell) {
                let _ = distances.insert(cell, 0);
                frontier.push_back(cell);
            }
        }

        CategoryPass {
            category,
            height,
            frontier,
            distances,
        }
    }

    /// Runs until the budget is spent or every category is finished.
    ///
    /// Returns the number of processed cells when suspending and `None` once
    /// nothing is left to do.
    fn advance<S>(&mut self, spatial: &S, budget: usize) -> Option<usize>
    where
        S: SpatialIndex + ?Sized,
    {
        let mut processed = 0;
        loop {
            let Some(pass) = self.current.as_mut() else {
                let category = self.pending.pop_front()?;
                self.current = Some(self.seed(category));
                continue;
            };

            let Some(cell) = pass.frontier.front().copied() else {
                if let Some(pass) = self.current.take() {
                    log::debug!(
                        "danger field for category {} covers {} cells",
                        pass.category.get(),
                        pass.distances.len()
                    );
                    let _ = self
                        .finished
                        .insert(pass.category, DangerField::new(pass.category, pass.distances));
                }
                continue;
            };

            if processed >= budget {
                return Some(processed);
            }

            let _ = pass.frontier.pop_front();
            processed += 1;

            let Some(bounds) = self.bounds else {
                continue;
            };
            let Some(&distance) = pass.distances.get(&cell) else {
                continue;
            };
            let next_distance = distance.saturating_add(1);

            for (dx, dz) in NEIGHBOR_OFFSETS {
                let neighbor = cell.offset(dx, dz);
                if !bounds.contains(neighbor) || pass.distances.contains_key(&neighbor) {
                    continue;
                }
                let walkable = *self
                    .walkable
                    .entry((neighbor, pass.height.to_bits()))
                    .or_insert_with(|| spatial.is_walkable(neighbor, pass.height));
                if !walkable {
                    continue;
                }
                let _ = pass.distances.insert(neighbor, next_distance);
                pass.frontier.push_back(neighbor);
            }
        }
    }
}

/// Chunked builder of per-category danger fields.
///
/// A rebuild snapshots the registry when it starts, then processes at most
/// `nodes_per_step` frontier cells per [`DangerFieldBuilder::step`]. The
/// previously published set stays visible until the whole rebuild completes.
#[derive(Debug)]
pub struct DangerFieldBuilder {
    bounds_margin: i32,
    nodes_per_step: usize,
    generation: u64,
    published: Arc<DangerFieldSet>,
    rebuild: Option<Rebuild>,
}

impl DangerFieldBuilder {
    /// Creates an idle builder with an empty generation-zero set.
    #[must_use]
    pub fn new(bounds_margin: i32, nodes_per_step: usize) -> Self {
        Self {
            bounds_margin: bounds_margin.max(0),
            nodes_per_step: nodes_per_step.max(1),
            generation: 0,
            published: Arc::new(DangerFieldSet::default()),
            rebuild: None,
        }
    }

    /// Whether a rebuild is in flight.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.rebuild.is_some()
    }

    /// Whether at least one set has been published.
    #[must_use]
    pub const fn has_published(&self) -> bool {
        self.generation > 0
    }

    /// Most recently published set.
    #[must_use]
    pub fn published(&self) -> &Arc<DangerFieldSet> {
        &self.published
    }

    /// Starts a rebuild from the registry's current entities unless one is running.
    pub fn begin<R>(&mut self, registry: &R) -> RebuildRequest
    where
        R: EntityRegistry + ?Sized,
    {
        if self.rebuild.is_some() {
            log::trace!("danger field rebuild already running; trigger ignored");
            return RebuildRequest::AlreadyRunning;
        }

        let mut entities = Vec::new();
        registry.collect_entities(&mut entities);
        let rebuild = Rebuild::new(entities, self.bounds_margin);
        log::debug!(
            "danger field rebuild started for {} entities in {} categories",
            rebuild.entities.len(),
            rebuild.pending.len()
        );
        self.rebuild = Some(rebuild);
        RebuildRequest::Started
    }

    /// Advances the in-flight rebuild by at most one chunk of work.
    pub fn step<S>(&mut self, spatial: &S) -> BuildProgress
    where
        S: SpatialIndex + ?Sized,
    {
        let Some(rebuild) = self.rebuild.as_mut() else {
            return BuildProgress::Idle;
        };

        if let Some(processed) = rebuild.advance(spatial, self.nodes_per_step) {
            log::trace!("danger field rebuild suspended after {processed} cells");
            return BuildProgress::Suspended { processed };
        }

        let Some(rebuild) = self.rebuild.take() else {
            return BuildProgress::Idle;
        };
        self.generation += 1;
        self.published = Arc::new(DangerFieldSet::new(self.generation, rebuild.finished));
        log::debug!(
            "published danger field generation {} with {} categories",
            self.generation,
            self.published.len()
        );
        BuildProgress::Published {
            generation: self.generation,
        }
    }
}
