//! The world: the root container of the runtime.
//!
//! A [`World`] owns the type registry, the entity allocator, archetype storage,
//! the resource store, and the event broker. Every structural operation (spawn,
//! despawn, component add and remove) goes through `&mut World`; value access
//! flows through queries or the direct per-entity accessors.
//!
//! The world is deliberately `!Send`: it is owned and driven by one thread.
//! Deferred mutation from systems goes through a
//! [`CommandBuffer`](crate::system::CommandBuffer) and is applied back on the
//! owning thread.

use std::marker::PhantomData;

use crate::{
    component::{BoxedBundle, Bundle, IntoSpec, Spec},
    entity::{Allocator, Entity},
    event::{Broker, Channel, Event, channel::EventId},
    query::{Data, Filter, Query},
    registry::TypeRegistry,
    resource::{Resource, Resources},
    storage::Storage,
    system::{CommandBuffer, IntoSystem},
};

/// Identifier of a world, for applications juggling more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(u32);

impl Id {
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

pub struct World {
    id: Id,
    registry: TypeRegistry,
    allocator: Allocator,
    storage: Storage,
    resources: Resources,
    events: Broker,

    /// Worlds are single-threaded by construction.
    _not_send: PhantomData<*mut ()>,
}

impl World {
    pub fn new(id: Id) -> Self {
        let registry = TypeRegistry::new();
        let storage = Storage::new(&registry);
        Self {
            id,
            registry,
            allocator: Allocator::default(),
            storage,
            resources: Resources::new(),
            events: Broker::new(),
            _not_send: PhantomData,
        }
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The type registry of this world.
    #[inline]
    pub fn types(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The entity allocator of this world.
    #[inline]
    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[inline]
    pub(crate) fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    // ---- entities ----------------------------------------------------------

    /// Spawn an entity carrying the components of `bundle`.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Entity {
        let entity = self.allocator.alloc();
        let boxed = BoxedBundle::new(bundle, &self.registry);
        self.spawn_at(entity, boxed);
        entity
    }

    /// Spawn an entity with no components.
    pub fn spawn_empty(&mut self) -> Entity {
        let entity = self.allocator.alloc();
        self.storage.spawn_empty(entity);
        entity
    }

    /// Spawn `count` entities, each carrying a clone of `bundle`.
    pub fn spawn_batch<B: Bundle + Clone>(&mut self, count: usize, bundle: B) -> Vec<Entity> {
        let entities = self.allocator.alloc_many(count);
        for &entity in &entities {
            let boxed = BoxedBundle::new(bundle.clone(), &self.registry);
            self.spawn_at(entity, boxed);
        }
        entities
    }

    /// Place a pre-allocated entity into storage with the given bundle.
    pub(crate) fn spawn_at(&mut self, entity: Entity, bundle: BoxedBundle) {
        let spec = bundle.spec().clone();
        self.storage
            .spawn_with(entity, spec, bundle.take(), &self.registry);
    }

    /// Despawn `entity`, dropping every component value and freeing its slot.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is not stored in this world.
    pub fn despawn(&mut self, entity: Entity) {
        self.storage.despawn(entity);
        self.allocator.free(entity);
    }

    /// Whether `entity` is live in this world.
    pub fn contains(&self, entity: Entity) -> bool {
        self.storage.contains(entity)
    }

    // ---- components --------------------------------------------------------

    /// Add the components of `bundle` to `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is unknown or already carries any of the added types.
    pub fn add_components<B: Bundle>(&mut self, entity: Entity, bundle: B) {
        let boxed = BoxedBundle::new(bundle, &self.registry);
        self.add_boxed(entity, boxed);
    }

    pub(crate) fn add_boxed(&mut self, entity: Entity, bundle: BoxedBundle) {
        self.storage.add(entity, bundle.take(), &self.registry);
    }

    /// Remove the components named by `S` from `entity`, dropping their values.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is unknown or lacks any of the removed types.
    pub fn remove_components<S: IntoSpec>(&mut self, entity: Entity) {
        let spec = S::into_spec(&self.registry);
        self.remove_by_spec(entity, &spec);
    }

    pub(crate) fn remove_by_spec(&mut self, entity: Entity, spec: &Spec) {
        self.storage.remove(entity, spec, &self.registry);
    }

    /// Borrow one component of `entity`.
    pub fn get<C: crate::component::Component>(&self, entity: Entity) -> Option<&C> {
        let id = self.registry.get::<C>()?;
        self.storage.get::<C>(entity, id)
    }

    /// Mutably borrow one component of `entity`.
    pub fn get_mut<C: crate::component::Component>(&mut self, entity: Entity) -> Option<&mut C> {
        let id = self.registry.get::<C>()?;
        self.storage.get_mut::<C>(entity, id)
    }

    /// Whether `entity` currently carries `C`.
    pub fn has<C: crate::component::Component>(&self, entity: Entity) -> bool {
        self.registry
            .get::<C>()
            .is_some_and(|id| self.storage.has(entity, id))
    }

    // ---- queries -----------------------------------------------------------

    /// Build a reusable query plan against this world's registry.
    pub fn query<D: Data>(&self) -> Query<D> {
        Query::new(&self.registry)
    }

    /// Build a filtered query plan.
    pub fn query_filtered<D: Data, F: Filter>(&self) -> Query<D, F> {
        Query::new(&self.registry)
    }

    // ---- resources ---------------------------------------------------------

    /// Insert a resource, replacing any previous value of the same type.
    pub fn insert_resource<R: Resource>(&mut self, value: R) -> Option<R> {
        self.registry.register_resource::<R>();
        self.resources.insert(value)
    }

    /// Remove and return a resource.
    pub fn remove_resource<R: Resource>(&mut self) -> Option<R> {
        self.resources.remove::<R>()
    }

    /// Borrow a resource.
    pub fn resource<R: Resource>(&self) -> Option<&R> {
        self.resources.get::<R>()
    }

    /// Mutably borrow a resource.
    pub fn resource_mut<R: Resource>(&mut self) -> Option<&mut R> {
        self.resources.get_mut::<R>()
    }

    pub(crate) fn resources(&self) -> &Resources {
        &self.resources
    }

    pub(crate) fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    // ---- events ------------------------------------------------------------

    /// Open the event channel for `E`. Idempotent.
    pub fn register_event<E: Event>(&mut self) {
        self.registry.register_event::<E>();
        self.events.register::<E>();
    }

    /// Send one event, opening the channel if needed.
    pub fn send_event<E: Event>(&mut self, event: E) -> EventId {
        self.register_event::<E>();
        self.events
            .channel_mut::<E>()
            .expect("channel registered above")
            .send(event)
    }

    /// The channel for `E`, if open.
    pub fn events<E: Event>(&self) -> Option<&Channel<E>> {
        self.events.channel::<E>()
    }

    /// The channel for `E`, mutably, if open.
    pub fn events_mut<E: Event>(&mut self) -> Option<&mut Channel<E>> {
        self.events.channel_mut::<E>()
    }

    /// Advance every event channel one frame. Call once per frame, after the
    /// frame's phases have run.
    pub fn update_events(&mut self) {
        self.events.update_all();
    }

    // ---- systems -----------------------------------------------------------

    /// Build and run one system immediately, then apply its deferred commands.
    pub fn run_once<M>(&mut self, system: impl IntoSystem<M>) {
        let mut system = system.into_system(self);
        let buffer = CommandBuffer::new();
        system.run(self, &buffer);
        buffer.flush(self);
    }

    /// Apply every queued command in `buffer` to this world, in push order.
    pub fn apply(&mut self, buffer: &CommandBuffer) {
        buffer.flush(self);
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("archetypes", &self.storage.archetypes().len())
            .finish()
    }
}
