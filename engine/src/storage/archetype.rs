//! Archetypes and the archetype arena.
//!
//! An [`Archetype`] groups every entity carrying exactly the same component set.
//! Its columns are row-aligned with the entity list, so one row index addresses
//! an entity and all of its values. Archetypes are created on demand, keyed by
//! their canonical [`Spec`], and never destroyed; an archetype left empty by
//! migration simply has zero rows.
//!
//! Each archetype caches single-component add and remove transitions in its
//! [`Edges`], so repeated structural changes skip the spec set math.

use std::collections::HashMap;

use fixedbitset::FixedBitSet;

use crate::{
    component::Spec,
    entity::Entity,
    registry::{TypeId, TypeRegistry},
    storage::column::Column,
    value::Val,
};

/// Identifier of an archetype within one world's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// The archetype holding entities with no components.
    pub const EMPTY: Id = Id(0);

    #[inline]
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Cached single-component transitions out of an archetype.
#[derive(Debug, Default)]
pub struct Edges {
    add: HashMap<TypeId, Id>,
    remove: HashMap<TypeId, Id>,
}

impl Edges {
    #[inline]
    pub fn add(&self, id: TypeId) -> Option<Id> {
        self.add.get(&id).copied()
    }

    #[inline]
    pub fn remove(&self, id: TypeId) -> Option<Id> {
        self.remove.get(&id).copied()
    }
}

pub struct Archetype {
    id: Id,
    components: Spec,

    /// Component membership as a bitset over registry ids, for query matching.
    mask: FixedBitSet,

    /// Entity per row.
    entities: Vec<Entity>,

    /// One column per component, ordered as in `components`.
    columns: Vec<Column>,

    edges: Edges,
}

impl Archetype {
    fn new(id: Id, components: Spec, registry: &TypeRegistry) -> Self {
        let mut mask = FixedBitSet::with_capacity(registry.len());
        let columns = components
            .ids()
            .iter()
            .map(|&type_id| {
                mask.insert(type_id.index());
                Column::new(registry.info(type_id))
            })
            .collect();
        Self {
            id,
            components,
            mask,
            entities: Vec::new(),
            columns,
            edges: Edges::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The component set every entity here carries.
    #[inline]
    pub fn components(&self) -> &Spec {
        &self.components
    }

    #[inline]
    pub fn edges(&self) -> &Edges {
        &self.edges
    }

    /// Number of entities (rows).
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The entity occupying `row`.
    #[inline]
    pub fn entity(&self, row: usize) -> Entity {
        self.entities[row]
    }

    /// Whether this archetype stores component `id`.
    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        self.components.contains(id)
    }

    /// Append a row for `entity` with default-constructed values in every
    /// column, returning the new row index.
    pub fn alloc_row(&mut self, entity: Entity) -> usize {
        self.entities.push(entity);
        for column in &mut self.columns {
            column.push_default();
        }
        self.entities.len() - 1
    }

    /// Overwrite one value in the row.
    ///
    /// # Panics
    ///
    /// Panics if this archetype has no column for `type_id`.
    pub fn set(&mut self, row: usize, type_id: TypeId, value: Val) {
        let index = self
            .components
            .position(type_id)
            .unwrap_or_else(|| panic!("archetype {:?} has no column for {:?}", self.id, type_id));
        self.columns[index].set(row, value);
    }

    /// Remove `row` from every column and the entity list.
    ///
    /// Returns the entity that was moved into `row` to fill the gap, or `None`
    /// if the removed row was the last one. The caller must update the moved
    /// entity's recorded location in the same operation.
    #[must_use]
    pub fn swap_remove_row(&mut self, row: usize) -> Option<Entity> {
        for column in &mut self.columns {
            drop(column.swap_remove(row));
        }
        self.entities.swap_remove(row);
        self.entities.get(row).copied()
    }

    fn column(&self, type_id: TypeId) -> Option<&Column> {
        self.components
            .position(type_id)
            .map(|index| &self.columns[index])
    }

    fn column_mut(&mut self, type_id: TypeId) -> Option<&mut Column> {
        self.components
            .position(type_id)
            .map(|index| &mut self.columns[index])
    }

    /// Clone the value at `row` in the column for `type_id`.
    pub fn duplicate(&self, type_id: TypeId, row: usize) -> Option<Val> {
        self.column(type_id).map(|column| column.duplicate(row))
    }

    /// Borrow a component value.
    #[inline]
    pub fn get<C: 'static>(&self, type_id: TypeId, row: usize) -> Option<&C> {
        self.column(type_id)?.get::<C>(row)
    }

    /// Mutably borrow a component value.
    #[inline]
    pub fn get_mut<C: 'static>(&mut self, type_id: TypeId, row: usize) -> Option<&mut C> {
        self.column_mut(type_id)?.get_mut::<C>(row)
    }

    // Column lookup by Rust type. Linear search is fine; component counts per
    // archetype are small.
    fn column_for<C: 'static>(&self) -> Option<&Column> {
        let std_id = std::any::TypeId::of::<C>();
        self.columns.iter().find(|column| column.std_id() == std_id)
    }

    fn column_for_mut<C: 'static>(&mut self) -> Option<&mut Column> {
        let std_id = std::any::TypeId::of::<C>();
        self.columns
            .iter_mut()
            .find(|column| column.std_id() == std_id)
    }

    /// Borrow a component value by Rust type.
    #[inline]
    pub fn component<C: 'static>(&self, row: usize) -> Option<&C> {
        self.column_for::<C>()?.get::<C>(row)
    }

    /// Mutably borrow a component value by Rust type.
    #[inline]
    pub fn component_mut<C: 'static>(&mut self, row: usize) -> Option<&mut C> {
        self.column_for_mut::<C>()?.get_mut::<C>(row)
    }
}

impl std::fmt::Debug for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Archetype")
            .field("id", &self.id)
            .field("components", &self.components)
            .field("len", &self.entities.len())
            .finish()
    }
}

/// The arena of every archetype in a world.
///
/// The empty archetype exists from construction at [`Id::EMPTY`]. Lookups by
/// spec hit a hash index; lookups by id index the arena directly.
pub struct Archetypes {
    arena: Vec<Archetype>,
    by_spec: HashMap<Spec, Id>,
}

impl Archetypes {
    pub fn new(registry: &TypeRegistry) -> Self {
        let mut archetypes = Self {
            arena: Vec::new(),
            by_spec: HashMap::new(),
        };
        let empty = archetypes.get_or_create(Spec::EMPTY, registry);
        debug_assert_eq!(empty, Id::EMPTY);
        archetypes
    }

    /// Look up the archetype for `spec`, creating it if absent.
    pub fn get_or_create(&mut self, spec: Spec, registry: &TypeRegistry) -> Id {
        if let Some(id) = self.by_spec.get(&spec) {
            return *id;
        }
        let id = Id::new(self.arena.len() as u32);
        log::debug!("creating archetype {:?} for {:?}", id, spec);
        self.arena.push(Archetype::new(id, spec.clone(), registry));
        self.by_spec.insert(spec, id);
        id
    }

    #[inline]
    pub fn get(&self, id: Id) -> &Archetype {
        &self.arena[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: Id) -> &mut Archetype {
        &mut self.arena[id.index()]
    }

    /// Mutably borrow two distinct archetypes at once, for row migration.
    ///
    /// # Panics
    ///
    /// Panics if `a == b`.
    pub fn pair_mut(&mut self, a: Id, b: Id) -> (&mut Archetype, &mut Archetype) {
        assert_ne!(a, b, "cannot split-borrow an archetype with itself");
        if a < b {
            let (head, tail) = self.arena.split_at_mut(b.index());
            (&mut head[a.index()], &mut tail[0])
        } else {
            let (head, tail) = self.arena.split_at_mut(a.index());
            (&mut tail[0], &mut head[b.index()])
        }
    }

    /// Cache a single-component add transition from `from`.
    pub fn record_add_edge(&mut self, from: Id, type_id: TypeId, to: Id) {
        self.get_mut(from).edges.add.insert(type_id, to);
    }

    /// Cache a single-component remove transition from `from`.
    pub fn record_remove_edge(&mut self, from: Id, type_id: TypeId, to: Id) {
        self.get_mut(from).edges.remove.insert(type_id, to);
    }

    /// Ids of every archetype whose component set covers `required` and is
    /// disjoint from `excluded`.
    ///
    /// Matching is recomputed per call; archetypes created since the last call
    /// are always considered.
    pub fn matching(&self, required: &FixedBitSet, excluded: &FixedBitSet) -> Vec<Id> {
        self.arena
            .iter()
            .filter(|archetype| {
                required.is_subset(&archetype.mask) && excluded.is_disjoint(&archetype.mask)
            })
            .map(|archetype| archetype.id)
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use ember_macros::Component;

    use super::*;
    use crate::registry::TypeRegistry;

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    fn setup() -> (TypeRegistry, Archetypes, TypeId, TypeId) {
        let registry = TypeRegistry::new();
        let pos = registry.register_component::<Position>();
        let vel = registry.register_component::<Velocity>();
        let archetypes = Archetypes::new(&registry);
        (registry, archetypes, pos, vel)
    }

    #[test]
    fn arena_starts_with_the_empty_archetype() {
        // Given
        let (_, archetypes, _, _) = setup();

        // Then
        assert_eq!(archetypes.len(), 1);
        assert!(archetypes.get(Id::EMPTY).components().is_empty());
    }

    #[test]
    fn equal_specs_share_one_archetype() {
        // Given
        let (registry, mut archetypes, pos, vel) = setup();

        // When
        let a = archetypes.get_or_create(Spec::new(vec![pos, vel]), &registry);
        let b = archetypes.get_or_create(Spec::new(vec![vel, pos]), &registry);

        // Then
        assert_eq!(a, b);
        assert_eq!(archetypes.len(), 2);
    }

    #[test]
    fn swap_remove_reports_the_displaced_entity() {
        // Given
        let (registry, mut archetypes, pos, _) = setup();
        let id = archetypes.get_or_create(Spec::new(vec![pos]), &registry);
        let archetype = archetypes.get_mut(id);
        let first = Entity::new(0_u32);
        let last = Entity::new(1_u32);
        archetype.alloc_row(first);
        archetype.alloc_row(last);

        // When
        let displaced = archetype.swap_remove_row(0);

        // Then - the tail entity now occupies row 0
        assert_eq!(displaced, Some(last));
        assert_eq!(archetype.entity(0), last);
        assert_eq!(archetype.len(), 1);
    }

    #[test]
    fn swap_remove_of_last_row_displaces_nothing() {
        // Given
        let (registry, mut archetypes, pos, _) = setup();
        let id = archetypes.get_or_create(Spec::new(vec![pos]), &registry);
        let archetype = archetypes.get_mut(id);
        archetype.alloc_row(Entity::new(0_u32));

        // When / Then
        assert_eq!(archetype.swap_remove_row(0), None);
        assert!(archetype.is_empty());
    }

    #[test]
    fn matching_respects_required_and_excluded_masks() {
        // Given
        let (registry, mut archetypes, pos, vel) = setup();
        let only_pos = archetypes.get_or_create(Spec::new(vec![pos]), &registry);
        let both = archetypes.get_or_create(Spec::new(vec![pos, vel]), &registry);

        let mut required = FixedBitSet::with_capacity(registry.len());
        required.insert(pos.index());
        let mut excluded = FixedBitSet::with_capacity(registry.len());

        // When - require Position
        let matched = archetypes.matching(&required, &excluded);

        // Then
        assert_eq!(matched, vec![only_pos, both]);

        // When - additionally exclude Velocity
        excluded.insert(vel.index());
        let matched = archetypes.matching(&required, &excluded);

        // Then
        assert_eq!(matched, vec![only_pos]);
    }

    #[test]
    fn matching_sees_archetypes_created_later() {
        // Given
        let (registry, mut archetypes, pos, _) = setup();
        let required = FixedBitSet::with_capacity(registry.len());
        let excluded = FixedBitSet::with_capacity(registry.len());
        let before = archetypes.matching(&required, &excluded).len();

        // When
        archetypes.get_or_create(Spec::new(vec![pos]), &registry);

        // Then
        assert_eq!(archetypes.matching(&required, &excluded).len(), before + 1);
    }

    #[test]
    fn edges_cache_single_component_transitions() {
        // Given
        let (registry, mut archetypes, pos, _) = setup();
        let with_pos = archetypes.get_or_create(Spec::new(vec![pos]), &registry);

        // When
        archetypes.record_add_edge(Id::EMPTY, pos, with_pos);
        archetypes.record_remove_edge(with_pos, pos, Id::EMPTY);

        // Then
        assert_eq!(archetypes.get(Id::EMPTY).edges().add(pos), Some(with_pos));
        assert_eq!(archetypes.get(with_pos).edges().remove(pos), Some(Id::EMPTY));
    }
}
