//! Runtime type registry.
//!
//! Every type the runtime stores in a type-erased slot (components, resources,
//! events) is registered here and assigned a small sequential [`TypeId`]. Ids are
//! handed out per registry instance and keyed by `std::any::TypeId`, so two distinct
//! Rust types can never share an id and the same type always maps to the same id
//! within one [`World`](crate::world::World).
//!
//! Component entries additionally carry a pair of erased operations behind a trait
//! object: default-construction (used when a column grows a row before receiving
//! its real value) and duplication (used when a row migrates between archetypes).
//! Resources and events need neither, because they are only ever moved as whole
//! [`Val`]s.
//!
//! # Thread safety
//!
//! Registration works through `&TypeRegistry`: the id index is a lock-free
//! `DashMap`, the info table sits behind an `RwLock`, and id assignment is an
//! atomic counter. Registration is idempotent; re-registering a type returns the
//! existing id unchanged.

use std::{
    any::{TypeId as StdTypeId, type_name},
    marker::PhantomData,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU32, Ordering},
    },
};

use dashmap::{DashMap, mapref::entry::Entry};

use crate::{component::Component, value::Val};

/// A registry-assigned type identifier. Unique per registry instance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Construct a TypeId from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Index of this id in indexable storage (e.g. a Vec or bitset).
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for TypeId {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

/// What role a registered type plays in the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Stored per entity in archetype columns.
    Component,
    /// Stored once per world in the resource map.
    Resource,
    /// Flows through a double-buffered event channel.
    Event,
}

/// Erased per-type operations needed by column storage.
///
/// Destruction is not part of the table: dropping the owning [`Val`] runs the
/// payload's destructor.
pub(crate) trait ErasedOps: Send + Sync {
    /// Default-construct a fresh value.
    fn construct(&self) -> Val;

    /// Clone the value held by `val`.
    ///
    /// # Panics
    ///
    /// Panics if `val` does not hold this type. Columns never present a
    /// mismatched value, so this indicates a corrupted archetype.
    fn duplicate(&self, val: &Val) -> Val;
}

struct Ops<C>(PhantomData<fn() -> C>);

impl<C: Component> ErasedOps for Ops<C> {
    fn construct(&self) -> Val {
        Val::new(C::default())
    }

    fn duplicate(&self, val: &Val) -> Val {
        let value = val
            .get::<C>()
            .unwrap_or_else(|| panic!("duplicate of mismatched value: held {}", val.type_name()));
        Val::new(value.clone())
    }
}

/// Metadata for one registered type.
#[derive(Clone)]
pub struct TypeInfo {
    id: TypeId,
    kind: TypeKind,
    std_id: StdTypeId,
    name: &'static str,
    ops: Option<Arc<dyn ErasedOps>>,
}

impl TypeInfo {
    /// The registry-assigned id.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The role this type was registered with.
    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// The `std::any::TypeId` of the registered type.
    #[inline]
    pub fn std_id(&self) -> StdTypeId {
        self.std_id
    }

    /// The fully-qualified type name, for diagnostics.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn ops(&self) -> &Arc<dyn ErasedOps> {
        let Some(ops) = &self.ops else {
            log::error!("type {} used in column storage without component ops", self.name);
            panic!("type {} is not registered as a component", self.name);
        };
        ops
    }

    /// Default-construct a value of this type.
    ///
    /// # Panics
    ///
    /// Panics if the type was not registered as a component.
    pub fn construct(&self) -> Val {
        self.ops().construct()
    }

    /// Clone the component value held by `val`.
    ///
    /// # Panics
    ///
    /// Panics if the type was not registered as a component, or `val` holds a
    /// different type.
    pub fn duplicate(&self, val: &Val) -> Val {
        self.ops().duplicate(val)
    }
}

impl std::fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInfo")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish()
    }
}

/// Thread-safe registry mapping Rust types to runtime [`TypeId`]s and [`TypeInfo`].
///
/// Constructed explicitly and owned by the [`World`](crate::world::World); callers
/// receive it by reference. There is no global instance.
#[derive(Default)]
pub struct TypeRegistry {
    /// Lock-free index from std TypeId to the runtime id.
    ids: DashMap<StdTypeId, TypeId>,

    /// Info table indexed by `TypeId::index()`.
    infos: RwLock<Vec<Option<TypeInfo>>>,

    /// Next id to assign.
    next: AtomicU32,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `C` as a component type. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics if `C` was previously registered with a different kind.
    pub fn register_component<C: Component>(&self) -> TypeId {
        self.register_with(TypeKind::Component, StdTypeId::of::<C>(), type_name::<C>(), || {
            Some(Arc::new(Ops::<C>(PhantomData)) as Arc<dyn ErasedOps>)
        })
    }

    /// Register `T` as a resource type. Idempotent.
    pub fn register_resource<T: Send + Sync + 'static>(&self) -> TypeId {
        self.register_with(TypeKind::Resource, StdTypeId::of::<T>(), type_name::<T>(), || None)
    }

    /// Register `T` as an event type. Idempotent.
    pub fn register_event<T: Send + Sync + 'static>(&self) -> TypeId {
        self.register_with(TypeKind::Event, StdTypeId::of::<T>(), type_name::<T>(), || None)
    }

    // Lock order is always id shard first, then `infos`; never `infos` while
    // waiting on a shard. The fast path copies the id out and releases the
    // shard guard before reading `infos`.
    fn register_with(
        &self,
        kind: TypeKind,
        std_id: StdTypeId,
        name: &'static str,
        make_ops: impl FnOnce() -> Option<Arc<dyn ErasedOps>>,
    ) -> TypeId {
        let existing = self.ids.get(&std_id).map(|entry| *entry);
        if let Some(id) = existing {
            self.check_kind(id, kind, name);
            return id;
        }

        match self.ids.entry(std_id) {
            Entry::Occupied(entry) => {
                // Another thread won the race. Release the shard before the
                // kind check takes `infos`.
                let id = *entry.get();
                drop(entry);
                self.check_kind(id, kind, name);
                id
            }
            Entry::Vacant(entry) => {
                let id = TypeId::new(self.next.fetch_add(1, Ordering::Relaxed));
                {
                    let mut infos = self.infos.write().expect("type registry poisoned");
                    if infos.len() <= id.index() {
                        infos.resize(id.index() + 1, None);
                    }
                    infos[id.index()] = Some(TypeInfo {
                        id,
                        kind,
                        std_id,
                        name,
                        ops: make_ops(),
                    });
                }
                // The info is in place before the id becomes visible.
                entry.insert(id);
                log::trace!("registered {:?} type {} as {:?}", kind, name, id);
                id
            }
        }
    }

    fn check_kind(&self, id: TypeId, kind: TypeKind, name: &'static str) {
        let infos = self.infos.read().expect("type registry poisoned");
        let info = infos[id.index()].as_ref().expect("registered id missing info");
        if info.kind != kind {
            log::error!(
                "type {} registered as {:?} and again as {:?}",
                name,
                info.kind,
                kind
            );
            panic!("type {name} registered with conflicting kinds");
        }
    }

    /// Look up the id for `T`, if it has been registered.
    pub fn get<T: 'static>(&self) -> Option<TypeId> {
        self.ids.get(&StdTypeId::of::<T>()).map(|id| *id)
    }

    /// Fetch the info for a registered id.
    ///
    /// # Panics
    ///
    /// Panics if the id was never assigned by this registry. Using an
    /// unregistered type in storage is a programmer error, not a recoverable
    /// condition.
    pub fn info(&self, id: TypeId) -> TypeInfo {
        let infos = self.infos.read().expect("type registry poisoned");
        match infos.get(id.index()).and_then(|slot| slot.clone()) {
            Some(info) => info,
            None => {
                log::error!("lookup of unregistered type id {id:?}");
                panic!("type id {id:?} was never registered");
            }
        }
    }

    /// Number of registered types. Also an exclusive upper bound on assigned
    /// id indices, used to size access bitsets.
    pub fn len(&self) -> usize {
        self.next.load(Ordering::Relaxed) as usize
    }

    /// Whether no types have been registered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use ember_macros::Component;

    use super::*;

    #[derive(Component, Clone, Default)]
    struct Health {
        value: u32,
    }

    #[derive(Component, Clone, Default)]
    struct Armor;

    #[test]
    fn registration_is_idempotent() {
        // Given
        let registry = TypeRegistry::new();

        // When
        let first = registry.register_component::<Health>();
        let second = registry.register_component::<Health>();

        // Then
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_types_get_distinct_ids() {
        // Given
        let registry = TypeRegistry::new();

        // When
        let health = registry.register_component::<Health>();
        let armor = registry.register_component::<Armor>();

        // Then
        assert_ne!(health, armor);
        assert_eq!(registry.get::<Health>(), Some(health));
        assert_eq!(registry.get::<Armor>(), Some(armor));
    }

    #[test]
    fn component_info_constructs_and_duplicates() {
        // Given
        let registry = TypeRegistry::new();
        let id = registry.register_component::<Health>();
        let info = registry.info(id);

        // When
        let fresh = info.construct();
        let copied = info.duplicate(&Val::new(Health { value: 7 }));

        // Then
        assert_eq!(fresh.get::<Health>().unwrap().value, 0);
        assert_eq!(copied.get::<Health>().unwrap().value, 7);
    }

    #[test]
    fn racing_re_registration_and_fresh_registration_complete() {
        macro_rules! fresh_markers {
            ($($name:ident),*) => {
                $(struct $name;)*
                fn register_fresh(registry: &TypeRegistry) {
                    $(registry.register_resource::<$name>();)*
                }
                const FRESH_COUNT: usize = [$(stringify!($name)),*].len();
            };
        }
        fresh_markers!(M0, M1, M2, M3, M4, M5, M6, M7, M8, M9, M10, M11, M12, M13, M14, M15);

        // Given
        let registry = Arc::new(TypeRegistry::new());
        registry.register_component::<Health>();

        // When - re-registrations of a known type race fresh registrations
        let mut handles = Vec::new();
        for _ in 0..4 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..20_000 {
                    registry.register_component::<Health>();
                }
            }));
        }
        let slow = Arc::clone(&registry);
        handles.push(std::thread::spawn(move || register_fresh(&slow)));
        for handle in handles {
            handle.join().unwrap();
        }

        // Then
        assert_eq!(registry.len(), FRESH_COUNT + 1);
    }

    #[test]
    #[should_panic(expected = "never registered")]
    fn unregistered_info_is_fatal() {
        let registry = TypeRegistry::new();
        registry.info(TypeId::new(9));
    }

    #[test]
    #[should_panic(expected = "conflicting kinds")]
    fn kind_mismatch_is_fatal() {
        let registry = TypeRegistry::new();
        registry.register_component::<Health>();
        registry.register_resource::<Health>();
    }

    #[test]
    #[should_panic(expected = "not registered as a component")]
    fn resource_types_have_no_column_ops() {
        struct Clock;
        let registry = TypeRegistry::new();
        let id = registry.register_resource::<Clock>();
        registry.info(id).construct();
    }
}
