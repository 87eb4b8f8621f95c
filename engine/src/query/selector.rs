//! Individual query selectors.
//!
//! A [`Selector`] is one element of a query's data tuple: a component borrow
//! (`&C`, `&mut C`), an optional borrow (`Option<&C>`, `Option<&mut C>`), or
//! the [`Entity`] handle itself. Selectors describe themselves as a
//! [`SelectorSpec`] for matching and validation, and fetch their value from an
//! archetype row during iteration.

use crate::{
    component::Component,
    entity::Entity,
    registry::{TypeId, TypeRegistry},
    storage::Archetype,
};

/// What one query selector accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorSpec {
    /// The entity handle. No storage access.
    Entity,
    /// A component column.
    Component {
        id: TypeId,
        mutable: bool,
        optional: bool,
    },
}

/// One element of a query's data tuple.
pub trait Selector {
    type Value<'w>;

    /// Describe this selector, registering its component type if unseen.
    fn spec(registry: &TypeRegistry) -> SelectorSpec;

    /// Fetch the value for `entity` at `row`.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that no other live borrow of the same column
    /// at the same row exists. The query validates at construction that no
    /// component appears twice in one data tuple.
    unsafe fn fetch<'w>(
        entity: Entity,
        archetype: &'w mut Archetype,
        row: usize,
    ) -> Option<Self::Value<'w>>;
}

impl<C: Component> Selector for &C {
    type Value<'w> = &'w C;

    fn spec(registry: &TypeRegistry) -> SelectorSpec {
        SelectorSpec::Component {
            id: registry.register_component::<C>(),
            mutable: false,
            optional: false,
        }
    }

    unsafe fn fetch<'w>(
        _entity: Entity,
        archetype: &'w mut Archetype,
        row: usize,
    ) -> Option<Self::Value<'w>> {
        archetype.component::<C>(row)
    }
}

impl<C: Component> Selector for &mut C {
    type Value<'w> = &'w mut C;

    fn spec(registry: &TypeRegistry) -> SelectorSpec {
        SelectorSpec::Component {
            id: registry.register_component::<C>(),
            mutable: true,
            optional: false,
        }
    }

    unsafe fn fetch<'w>(
        _entity: Entity,
        archetype: &'w mut Archetype,
        row: usize,
    ) -> Option<Self::Value<'w>> {
        archetype.component_mut::<C>(row)
    }
}

impl<C: Component> Selector for Option<&C> {
    type Value<'w> = Option<&'w C>;

    fn spec(registry: &TypeRegistry) -> SelectorSpec {
        SelectorSpec::Component {
            id: registry.register_component::<C>(),
            mutable: false,
            optional: true,
        }
    }

    unsafe fn fetch<'w>(
        _entity: Entity,
        archetype: &'w mut Archetype,
        row: usize,
    ) -> Option<Self::Value<'w>> {
        Some(archetype.component::<C>(row))
    }
}

impl<C: Component> Selector for Option<&mut C> {
    type Value<'w> = Option<&'w mut C>;

    fn spec(registry: &TypeRegistry) -> SelectorSpec {
        SelectorSpec::Component {
            id: registry.register_component::<C>(),
            mutable: true,
            optional: true,
        }
    }

    unsafe fn fetch<'w>(
        _entity: Entity,
        archetype: &'w mut Archetype,
        row: usize,
    ) -> Option<Self::Value<'w>> {
        Some(archetype.component_mut::<C>(row))
    }
}

impl Selector for Entity {
    type Value<'w> = Entity;

    fn spec(_registry: &TypeRegistry) -> SelectorSpec {
        SelectorSpec::Entity
    }

    unsafe fn fetch<'w>(
        entity: Entity,
        _archetype: &'w mut Archetype,
        _row: usize,
    ) -> Option<Self::Value<'w>> {
        Some(entity)
    }
}
