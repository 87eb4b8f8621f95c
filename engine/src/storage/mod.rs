//! Entity component storage.
//!
//! [`Storage`] owns the archetype arena and the entity location index, and
//! implements every structural mutation: spawn, despawn, component add and
//! remove. Adds and removes migrate the entity's row between archetypes:
//!
//! 1. look up the current location
//! 2. resolve the target archetype (edge cache first, set math on a miss)
//! 3. allocate a row for the entity in the target
//! 4. copy surviving values across and write any incoming values
//! 5. swap-remove the old row, fixing up the location of whichever entity the
//!    swap displaced
//! 6. record the entity's new location
//!
//! Misuse is fatal: adding a component the entity already has, removing one it
//! lacks, or mutating an unknown entity panics rather than corrupting the
//! location index.

pub mod archetype;
pub mod column;

pub use archetype::{Archetype, Archetypes};

use crate::{
    component::Spec,
    entity::Entity,
    registry::{TypeId, TypeRegistry},
    value::Val,
};

/// Where an entity's data lives: which archetype, and which row within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub archetype: archetype::Id,
    pub row: usize,
}

/// Entity-slot-indexed location map.
#[derive(Default)]
struct Locations {
    slots: Vec<Option<Location>>,
}

impl Locations {
    fn get(&self, entity: Entity) -> Option<Location> {
        self.slots.get(entity.index()).copied().flatten()
    }

    fn set(&mut self, entity: Entity, location: Location) {
        if self.slots.len() <= entity.index() {
            self.slots.resize(entity.index() + 1, None);
        }
        self.slots[entity.index()] = Some(location);
    }

    fn clear(&mut self, entity: Entity) {
        if let Some(slot) = self.slots.get_mut(entity.index()) {
            *slot = None;
        }
    }
}

pub struct Storage {
    archetypes: Archetypes,
    locations: Locations,
}

impl Storage {
    pub fn new(registry: &TypeRegistry) -> Self {
        Self {
            archetypes: Archetypes::new(registry),
            locations: Locations::default(),
        }
    }

    #[inline]
    pub fn archetypes(&self) -> &Archetypes {
        &self.archetypes
    }

    #[inline]
    pub(crate) fn archetypes_mut(&mut self) -> &mut Archetypes {
        &mut self.archetypes
    }

    /// The current location of `entity`, if it is stored here.
    #[inline]
    pub fn location(&self, entity: Entity) -> Option<Location> {
        self.locations.get(entity)
    }

    /// Whether `entity` is stored here.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.locations.get(entity).is_some()
    }

    fn location_or_panic(&self, entity: Entity) -> Location {
        match self.locations.get(entity) {
            Some(location) => location,
            None => {
                log::error!("structural operation on unknown entity {entity:?}");
                panic!("entity {entity:?} is not stored in this world");
            }
        }
    }

    /// Place `entity` in the empty archetype.
    pub fn spawn_empty(&mut self, entity: Entity) {
        assert!(
            !self.contains(entity),
            "entity {entity:?} is already stored"
        );
        let archetype = self.archetypes.get_mut(archetype::Id::EMPTY);
        let row = archetype.alloc_row(entity);
        self.locations.set(
            entity,
            Location {
                archetype: archetype::Id::EMPTY,
                row,
            },
        );
        log::trace!("spawned {entity:?} into the empty archetype");
    }

    /// Place `entity` directly in the archetype for `spec` and fill its row
    /// with `values`.
    pub fn spawn_with(
        &mut self,
        entity: Entity,
        spec: Spec,
        values: Vec<(TypeId, Val)>,
        registry: &TypeRegistry,
    ) {
        assert!(
            !self.contains(entity),
            "entity {entity:?} is already stored"
        );
        let id = self.archetypes.get_or_create(spec, registry);
        let archetype = self.archetypes.get_mut(id);
        let row = archetype.alloc_row(entity);
        for (type_id, value) in values {
            archetype.set(row, type_id, value);
        }
        self.locations.set(entity, Location { archetype: id, row });
        log::trace!("spawned {entity:?} into archetype {id:?}");
    }

    /// Remove `entity` and drop all of its values.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not stored.
    pub fn despawn(&mut self, entity: Entity) {
        let location = self.location_or_panic(entity);
        let archetype = self.archetypes.get_mut(location.archetype);
        let displaced = archetype.swap_remove_row(location.row);
        self.locations.clear(entity);
        if let Some(moved) = displaced {
            self.locations.set(moved, location);
        }
        log::trace!("despawned {entity:?}");
    }

    /// Move `entity` to the archetype that additionally stores the types in
    /// `incoming`, writing the new values into the target row.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not stored, or already has any incoming type.
    pub fn add(
        &mut self,
        entity: Entity,
        incoming: Vec<(TypeId, Val)>,
        registry: &TypeRegistry,
    ) {
        if incoming.is_empty() {
            return;
        }
        let location = self.location_or_panic(entity);
        let source_spec = self.archetypes.get(location.archetype).components().clone();
        let added: Spec = incoming.iter().map(|(id, _)| *id).collect();
        if source_spec.contains_any(&added) {
            log::error!("adding duplicate components {added:?} to {entity:?}");
            panic!("entity {entity:?} already has one of the added components");
        }

        let target = self.target_for_add(location.archetype, &source_spec, &added, registry);
        self.migrate(entity, location, target, incoming);
    }

    /// Move `entity` to the archetype without the types in `removed`, dropping
    /// their values.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not stored, or lacks any removed type.
    pub fn remove(&mut self, entity: Entity, removed: &Spec, registry: &TypeRegistry) {
        if removed.is_empty() {
            return;
        }
        let location = self.location_or_panic(entity);
        let source_spec = self.archetypes.get(location.archetype).components().clone();
        if !source_spec.contains_all(removed) {
            log::error!("removing absent components {removed:?} from {entity:?}");
            panic!("entity {entity:?} lacks one of the removed components");
        }

        let target = self.target_for_remove(location.archetype, &source_spec, removed, registry);
        self.migrate(entity, location, target, Vec::new());
    }

    /// Borrow a component value of `entity`.
    pub fn get<C: 'static>(&self, entity: Entity, type_id: TypeId) -> Option<&C> {
        let location = self.locations.get(entity)?;
        self.archetypes
            .get(location.archetype)
            .get::<C>(type_id, location.row)
    }

    /// Mutably borrow a component value of `entity`.
    pub fn get_mut<C: 'static>(&mut self, entity: Entity, type_id: TypeId) -> Option<&mut C> {
        let location = self.locations.get(entity)?;
        self.archetypes
            .get_mut(location.archetype)
            .get_mut::<C>(type_id, location.row)
    }

    /// Whether `entity` currently carries component `type_id`.
    pub fn has(&self, entity: Entity, type_id: TypeId) -> bool {
        self.locations
            .get(entity)
            .is_some_and(|location| self.archetypes.get(location.archetype).contains(type_id))
    }

    fn target_for_add(
        &mut self,
        source: archetype::Id,
        source_spec: &Spec,
        added: &Spec,
        registry: &TypeRegistry,
    ) -> archetype::Id {
        // Single-type transitions go through the edge cache.
        if let [type_id] = added.ids() {
            if let Some(target) = self.archetypes.get(source).edges().add(*type_id) {
                return target;
            }
            let target = self
                .archetypes
                .get_or_create(source_spec.with(added), registry);
            self.archetypes.record_add_edge(source, *type_id, target);
            return target;
        }
        self.archetypes.get_or_create(source_spec.with(added), registry)
    }

    fn target_for_remove(
        &mut self,
        source: archetype::Id,
        source_spec: &Spec,
        removed: &Spec,
        registry: &TypeRegistry,
    ) -> archetype::Id {
        if let [type_id] = removed.ids() {
            if let Some(target) = self.archetypes.get(source).edges().remove(*type_id) {
                return target;
            }
            let target = self
                .archetypes
                .get_or_create(source_spec.without(removed), registry);
            self.archetypes.record_remove_edge(source, *type_id, target);
            return target;
        }
        self.archetypes
            .get_or_create(source_spec.without(removed), registry)
    }

    /// Move one entity row from its current archetype to `target`, carrying
    /// surviving values across and writing `incoming` into the new row.
    fn migrate(
        &mut self,
        entity: Entity,
        from: Location,
        target: archetype::Id,
        incoming: Vec<(TypeId, Val)>,
    ) {
        let (source, dest) = self.archetypes.pair_mut(from.archetype, target);

        let row = dest.alloc_row(entity);
        // Copy-construct surviving values into the target before touching the
        // source row.
        for &type_id in dest.components().clone().ids() {
            if let Some(value) = source.duplicate(type_id, from.row) {
                dest.set(row, type_id, value);
            }
        }
        for (type_id, value) in incoming {
            dest.set(row, type_id, value);
        }

        let displaced = source.swap_remove_row(from.row);
        if let Some(moved) = displaced {
            self.locations.set(moved, from);
        }
        self.locations.set(entity, Location { archetype: target, row });
        log::trace!(
            "migrated {entity:?} from {:?} to {target:?}",
            from.archetype
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ember_macros::Component;

    use super::*;
    use crate::entity::Allocator;

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Velocity {
        dx: i32,
        dy: i32,
    }

    #[derive(Component, Clone, Default, Debug)]
    struct Tracked(Option<Arc<()>>);

    fn pair(registry: &TypeRegistry, entity: Entity, position: Position) -> Vec<(TypeId, Val)> {
        vec![(registry.register_component::<Position>(), Val::new(position))]
            .into_iter()
            .chain(std::iter::once((
                registry.register_component::<Velocity>(),
                Val::new(Velocity {
                    dx: entity.index() as i32,
                    dy: 0,
                }),
            )))
            .collect()
    }

    #[test]
    fn add_migrates_row_and_preserves_values() {
        // Given
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let pos = registry.register_component::<Position>();
        let vel = registry.register_component::<Velocity>();
        let entity = allocator.alloc();
        storage.spawn_with(
            entity,
            Spec::new(vec![pos]),
            vec![(pos, Val::new(Position { x: 1, y: 2 }))],
            &registry,
        );

        // When
        storage.add(entity, vec![(vel, Val::new(Velocity { dx: 3, dy: 4 }))], &registry);

        // Then
        assert_eq!(storage.get::<Position>(entity, pos), Some(&Position { x: 1, y: 2 }));
        assert_eq!(storage.get::<Velocity>(entity, vel), Some(&Velocity { dx: 3, dy: 4 }));
        let location = storage.location(entity).unwrap();
        assert_eq!(
            storage.archetypes().get(location.archetype).components(),
            &Spec::new(vec![pos, vel])
        );
    }

    #[test]
    fn remove_drops_the_value_and_keeps_the_rest() {
        // Given
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let pos = registry.register_component::<Position>();
        let vel = registry.register_component::<Velocity>();
        let entity = allocator.alloc();
        storage.spawn_with(
            entity,
            Spec::new(vec![pos, vel]),
            vec![
                (pos, Val::new(Position { x: 5, y: 6 })),
                (vel, Val::new(Velocity { dx: 7, dy: 8 })),
            ],
            &registry,
        );

        // When
        storage.remove(entity, &Spec::new(vec![vel]), &registry);

        // Then
        assert_eq!(storage.get::<Position>(entity, pos), Some(&Position { x: 5, y: 6 }));
        assert!(!storage.has(entity, vel));
    }

    #[test]
    fn migration_fixes_up_the_displaced_entity() {
        // Given - three entities in the same archetype
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let pos = registry.register_component::<Position>();
        let vel = registry.register_component::<Velocity>();
        let entities: Vec<_> = (0..3).map(|_| allocator.alloc()).collect();
        for (i, &entity) in entities.iter().enumerate() {
            storage.spawn_with(
                entity,
                Spec::new(vec![pos]),
                vec![(pos, Val::new(Position { x: i as i32, y: 0 }))],
                &registry,
            );
        }

        // When - migrate the first entity out, displacing the last into row 0
        storage.add(entities[0], vec![(vel, Val::new(Velocity::default()))], &registry);

        // Then - every entity still resolves to its own values
        for (i, &entity) in entities.iter().enumerate() {
            assert_eq!(
                storage.get::<Position>(entity, pos),
                Some(&Position { x: i as i32, y: 0 })
            );
        }
        let moved = storage.location(entities[2]).unwrap();
        assert_eq!(moved.row, 0);
    }

    #[test]
    fn despawn_fixes_up_the_displaced_entity() {
        // Given
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let first = allocator.alloc();
        let second = allocator.alloc();
        for &(entity, x) in &[(first, 1), (second, 2)] {
            let pos = registry.register_component::<Position>();
            storage.spawn_with(
                entity,
                Spec::new(vec![pos]),
                vec![(pos, Val::new(Position { x, y: 0 }))],
                &registry,
            );
        }
        let pos = registry.register_component::<Position>();

        // When
        storage.despawn(first);

        // Then
        assert!(!storage.contains(first));
        assert_eq!(storage.get::<Position>(second, pos), Some(&Position { x: 2, y: 0 }));
        assert_eq!(storage.location(second).unwrap().row, 0);
    }

    #[test]
    fn edge_cache_reuses_the_same_target() {
        // Given
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let vel = registry.register_component::<Velocity>();
        let a = allocator.alloc();
        let b = allocator.alloc();
        storage.spawn_empty(a);
        storage.spawn_empty(b);

        // When
        storage.add(a, vec![(vel, Val::new(Velocity::default()))], &registry);
        let count_after_first = storage.archetypes().len();
        storage.add(b, vec![(vel, Val::new(Velocity::default()))], &registry);

        // Then - second add rides the cached edge, no new archetype
        assert_eq!(storage.archetypes().len(), count_after_first);
        assert_eq!(
            storage.location(a).unwrap().archetype,
            storage.location(b).unwrap().archetype
        );
        assert_eq!(
            storage
                .archetypes()
                .get(archetype::Id::EMPTY)
                .edges()
                .add(vel),
            Some(storage.location(a).unwrap().archetype)
        );
    }

    #[test]
    #[should_panic(expected = "already has one of the added components")]
    fn double_add_is_fatal() {
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let pos = registry.register_component::<Position>();
        let entity = allocator.alloc();
        storage.spawn_with(
            entity,
            Spec::new(vec![pos]),
            vec![(pos, Val::new(Position::default()))],
            &registry,
        );
        storage.add(entity, vec![(pos, Val::new(Position::default()))], &registry);
    }

    #[test]
    #[should_panic(expected = "lacks one of the removed components")]
    fn absent_remove_is_fatal() {
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let vel = registry.register_component::<Velocity>();
        let entity = allocator.alloc();
        storage.spawn_empty(entity);
        storage.remove(entity, &Spec::new(vec![vel]), &registry);
    }

    #[test]
    #[should_panic(expected = "is not stored")]
    fn despawn_of_unknown_entity_is_fatal() {
        let registry = TypeRegistry::new();
        let mut storage = Storage::new(&registry);
        storage.despawn(Entity::new(99_u32));
    }

    #[test]
    fn despawn_drops_component_values() {
        // Given
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let tracked = registry.register_component::<Tracked>();
        let payload = Arc::new(());
        let entity = allocator.alloc();
        storage.spawn_with(
            entity,
            Spec::new(vec![tracked]),
            vec![(tracked, Val::new(Tracked(Some(payload.clone()))))],
            &registry,
        );
        assert_eq!(Arc::strong_count(&payload), 2);

        // When
        storage.despawn(entity);

        // Then
        assert_eq!(Arc::strong_count(&payload), 1);
    }

    #[test]
    fn migration_drops_the_source_copy() {
        // Given
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let tracked = registry.register_component::<Tracked>();
        let vel = registry.register_component::<Velocity>();
        let payload = Arc::new(());
        let entity = allocator.alloc();
        storage.spawn_with(
            entity,
            Spec::new(vec![tracked]),
            vec![(tracked, Val::new(Tracked(Some(payload.clone()))))],
            &registry,
        );

        // When
        storage.add(entity, vec![(vel, Val::new(Velocity::default()))], &registry);

        // Then - exactly one live copy besides ours survives the move
        assert_eq!(Arc::strong_count(&payload), 2);
    }

    #[test]
    fn spawn_with_multi_component_values_land_in_their_columns() {
        // Given
        let registry = TypeRegistry::new();
        let allocator = Allocator::default();
        let mut storage = Storage::new(&registry);
        let entity = allocator.alloc();
        let values = pair(&registry, entity, Position { x: 9, y: 9 });
        let spec: Spec = values.iter().map(|(id, _)| *id).collect();

        // When
        storage.spawn_with(entity, spec, values, &registry);

        // Then
        let pos = registry.get::<Position>().unwrap();
        assert_eq!(storage.get::<Position>(entity, pos), Some(&Position { x: 9, y: 9 }));
    }
}
