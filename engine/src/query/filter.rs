//! Structural query filters.
//!
//! Filters narrow which archetypes a query visits without touching any values:
//! [`With<C>`] requires the component to be present, [`Without<C>`] requires it
//! absent. Tuples of filters combine their conditions. The default filter `()`
//! matches everything.

use std::marker::PhantomData;

use crate::{
    component::{Component, Spec},
    registry::TypeRegistry,
};

/// Matches only archetypes carrying `C`.
pub struct With<C: Component>(PhantomData<fn() -> C>);

/// Matches only archetypes not carrying `C`.
pub struct Without<C: Component>(PhantomData<fn() -> C>);

/// The structural conditions of a filter.
#[derive(Debug, Default, Clone)]
pub struct FilterSpec {
    /// Components a matching archetype must carry.
    pub with: Spec,
    /// Components a matching archetype must not carry.
    pub without: Spec,
}

impl FilterSpec {
    fn merge(self, other: FilterSpec) -> FilterSpec {
        FilterSpec {
            with: self.with.with(&other.with),
            without: self.without.with(&other.without),
        }
    }
}

/// A structural condition on archetype membership.
pub trait Filter {
    fn spec(registry: &TypeRegistry) -> FilterSpec;
}

impl Filter for () {
    fn spec(_registry: &TypeRegistry) -> FilterSpec {
        FilterSpec::default()
    }
}

impl<C: Component> Filter for With<C> {
    fn spec(registry: &TypeRegistry) -> FilterSpec {
        FilterSpec {
            with: Spec::new(vec![registry.register_component::<C>()]),
            without: Spec::EMPTY,
        }
    }
}

impl<C: Component> Filter for Without<C> {
    fn spec(registry: &TypeRegistry) -> FilterSpec {
        FilterSpec {
            with: Spec::EMPTY,
            without: Spec::new(vec![registry.register_component::<C>()]),
        }
    }
}

macro_rules! filter_tuple_impl {
    ($($f:ident),+) => {
        impl<$($f: Filter),+> Filter for ($($f,)+) {
            fn spec(registry: &TypeRegistry) -> FilterSpec {
                let mut spec = FilterSpec::default();
                $(spec = spec.merge($f::spec(registry));)+
                spec
            }
        }
    };
}

crate::each_tuple!(filter_tuple_impl @ A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use ember_macros::Component;

    use super::*;

    #[derive(Component, Clone, Default)]
    struct Frozen;

    #[derive(Component, Clone, Default)]
    struct Burning;

    #[test]
    fn with_and_without_record_their_components() {
        // Given
        let registry = TypeRegistry::new();

        // When
        let spec = <(With<Frozen>, Without<Burning>)>::spec(&registry);

        // Then
        assert_eq!(spec.with.ids(), &[registry.get::<Frozen>().unwrap()]);
        assert_eq!(spec.without.ids(), &[registry.get::<Burning>().unwrap()]);
    }

    #[test]
    fn unit_filter_is_unconstrained() {
        // Given
        let registry = TypeRegistry::new();

        // When
        let spec = <()>::spec(&registry);

        // Then
        assert!(spec.with.is_empty());
        assert!(spec.without.is_empty());
    }
}
