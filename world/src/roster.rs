use std::collections::{BTreeMap, BTreeSet};

use safepath_core::{Category, EntityId, EntityRecord, EntityRegistry, Vec3};

/// Registry of tracked entities keyed by identifier.
///
/// Identifiers are allocated monotonically and never reused, so a stale
/// identifier held by the host simply stops resolving after removal.
#[derive(Clone, Debug, Default)]
pub struct EntityRoster {
    next_id: u32,
    entities: BTreeMap<EntityId, Tracked>,
}

#[derive(Clone, Copy, Debug)]
struct Tracked {
    category: Category,
    position: Vec3,
}

impl EntityRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking an entity and returns the identifier allocated to it.
    pub fn register(&mut self, category: Category, position: Vec3) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        let _ = self.entities.insert(id, Tracked { category, position });
        id
    }

    /// Stops tracking an entity, returning its last known record.
    pub fn unregister(&mut self, id: EntityId) -> Option<EntityRecord> {
        self.entities
            .remove(&id)
            .map(|tracked| record(id, tracked))
    }

    /// Moves a tracked entity. Returns `false` when the identifier is unknown.
    pub fn relocate(&mut self, id: EntityId, position: Vec3) -> bool {
        match self.entities.get_mut(&id) {
            Some(tracked) => {
                tracked.position = position;
                true
            }
            None => false,
        }
    }

    /// Record describing the entity, if it is tracked.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<EntityRecord> {
        self.entities.get(&id).map(|tracked| record(id, *tracked))
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Reports whether no entities are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterator over every tracked entity in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = EntityRecord> + '_ {
        self.entities
            .iter()
            .map(|(id, tracked)| record(*id, *tracked))
    }

    /// Distinct categories currently represented in the roster.
    #[must_use]
    pub fn categories(&self) -> BTreeSet<Category> {
        self.entities
            .values()
            .map(|tracked| tracked.category)
            .collect()
    }
}

impl EntityRegistry for EntityRoster {
    fn collect_entities(&self, out: &mut Vec<EntityRecord>) {
        out.extend(self.iter());
    }
}

fn record(id: EntityId, tracked: Tracked) -> EntityRecord {
    EntityRecord {
        id,
        category: tracked.category,
        position: tracked.position,
    }
}
