use std::{sync::Arc, time::Duration};

use safepath_core::{Category, CellCoord, EntityRegistry, SpatialIndex, Vec3};

use crate::{
    BuildProgress, DangerFieldBuilder, DangerFieldSet, DangerFieldTuning, RebuildRequest,
    TuningError,
};

/// Score returned by [`DangerFieldService::lookup`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScoreLookup {
    /// The cell was visited by the last published rebuild.
    Measured(u32),
    /// No measurement exists; the value is the configured neutral score.
    Fallback(u32),
}

impl ScoreLookup {
    /// Score regardless of where it came from.
    #[must_use]
    pub const fn value(self) -> u32 {
        match self {
            Self::Measured(score) | Self::Fallback(score) => score,
        }
    }
}

/// Periodically rebuilt danger fields with score queries.
///
/// The host calls [`DangerFieldService::advance`] once per tick. Queries may be
/// issued at any time and always read the last fully published set.
#[derive(Debug)]
pub struct DangerFieldService {
    tuning: DangerFieldTuning,
    builder: DangerFieldBuilder,
    interval: Duration,
    accumulator: Duration,
}

impl DangerFieldService {
    /// Creates a service after validating the tuning. The first advance triggers a rebuild.
    pub fn new(tuning: DangerFieldTuning) -> Result<Self, TuningError> {
        tuning.validate()?;
        let interval = tuning.rebuild_interval();
        Ok(Self {
            builder: DangerFieldBuilder::new(tuning.bounds_margin, tuning.nodes_per_step),
            tuning,
            interval,
            accumulator: interval,
        })
    }

    /// Tuning driving this service.
    #[must_use]
    pub fn tuning(&self) -> &DangerFieldTuning {
        &self.tuning
    }

    /// Whether a field set has been published at least once.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.builder.has_published()
    }

    /// Whether a rebuild is currently in flight.
    #[must_use]
    pub const fn is_rebuilding(&self) -> bool {
        self.builder.is_running()
    }

    /// Shared handle to the last published set.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DangerFieldSet> {
        Arc::clone(self.builder.published())
    }

    /// Starts a rebuild now unless one is already running.
    pub fn trigger_rebuild<R>(&mut self, registry: &R) -> RebuildRequest
    where
        R: EntityRegistry + ?Sized,
    {
        self.builder.begin(registry)
    }

    /// Performs one chunk of the in-flight rebuild, if any.
    pub fn step<S>(&mut self, spatial: &S) -> BuildProgress
    where
        S: SpatialIndex + ?Sized,
    {
        self.builder.step(spatial)
    }

    /// Advances the rebuild timer by `dt`, triggering a rebuild when the interval
    /// elapses, then performs one chunk of work.
    pub fn advance<S, R>(&mut self, dt: Duration, spatial: &S, registry: &R) -> BuildProgress
    where
        S: SpatialIndex + ?Sized,
        R: EntityRegistry + ?Sized,
    {
        self.accumulator = self.accumulator.saturating_add(dt);
        let mut due = false;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            due = true;
        }
        if due {
            let _ = self.builder.begin(registry);
        }
        self.builder.step(spatial)
    }

    /// Score for `position` relative to threats of `category`, tagged with its origin.
    #[must_use]
    pub fn lookup(&self, category: Category, position: Vec3) -> ScoreLookup {
        let cell = CellCoord::from_world(position);
        self.builder
            .published()
            .field(category)
            .and_then(|field| field.distance(cell))
            .map_or(ScoreLookup::Fallback(self.tuning.neutral_score), |distance| {
                ScoreLookup::Measured(
                    self.tuning
                        .score_ceiling
                        .map_or(distance, |ceiling| distance.min(ceiling)),
                )
            })
    }

    /// Score for `position` relative to threats of `category`.
    ///
    /// Larger is safer. Unknown cells report the neutral score.
    #[must_use]
    pub fn query(&self, category: Category, position: Vec3) -> u32 {
        self.lookup(category, position).value()
    }
}
