//! World-global singleton values.
//!
//! A resource is a value stored once per world rather than per entity: clocks,
//! asset handles, score counters. Implement the marker with
//! `#[derive(Resource)]` and insert values through the world.

use std::{
    any::{TypeId as StdTypeId, type_name},
    collections::HashMap,
};

use crate::value::Val;

/// Marker trait for per-world singleton values.
pub trait Resource: Send + Sync + 'static {}

/// The resource store of one world.
#[derive(Default)]
pub struct Resources {
    values: HashMap<StdTypeId, Val>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value`, returning the previous value of the same type if any.
    pub fn insert<R: Resource>(&mut self, value: R) -> Option<R> {
        self.values
            .insert(StdTypeId::of::<R>(), Val::new(value))
            .and_then(|old| old.take::<R>().ok())
    }

    /// Remove and return the stored `R`.
    pub fn remove<R: Resource>(&mut self) -> Option<R> {
        self.values
            .remove(&StdTypeId::of::<R>())
            .and_then(|val| val.take::<R>().ok())
    }

    /// Borrow the stored `R`.
    pub fn get<R: Resource>(&self) -> Option<&R> {
        self.values.get(&StdTypeId::of::<R>())?.get::<R>()
    }

    /// Mutably borrow the stored `R`.
    pub fn get_mut<R: Resource>(&mut self) -> Option<&mut R> {
        self.values.get_mut(&StdTypeId::of::<R>())?.get_mut::<R>()
    }

    /// Whether an `R` is stored.
    pub fn contains<R: Resource>(&self) -> bool {
        self.values.contains_key(&StdTypeId::of::<R>())
    }

    /// Borrow the stored `R`, panicking when absent.
    ///
    /// # Panics
    ///
    /// Panics if no `R` was inserted. Systems that can tolerate absence should
    /// use the `Option` accessors instead.
    pub fn expect<R: Resource>(&self) -> &R {
        match self.get::<R>() {
            Some(resource) => resource,
            None => {
                log::error!("required resource {} is missing", type_name::<R>());
                panic!("resource {} was never inserted", type_name::<R>());
            }
        }
    }

    /// Mutable variant of [`expect`](Resources::expect).
    pub fn expect_mut<R: Resource>(&mut self) -> &mut R {
        if !self.contains::<R>() {
            log::error!("required resource {} is missing", type_name::<R>());
            panic!("resource {} was never inserted", type_name::<R>());
        }
        self.get_mut::<R>().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use ember_macros::Resource;

    use super::*;

    #[derive(Resource, Debug, PartialEq)]
    struct Score(u32);

    #[test]
    fn insert_replaces_and_returns_the_old_value() {
        // Given
        let mut resources = Resources::new();
        assert_eq!(resources.insert(Score(1)), None);

        // When
        let old = resources.insert(Score(2));

        // Then
        assert_eq!(old, Some(Score(1)));
        assert_eq!(resources.get::<Score>(), Some(&Score(2)));
    }

    #[test]
    fn remove_takes_the_value_out() {
        // Given
        let mut resources = Resources::new();
        resources.insert(Score(3));

        // When
        let taken = resources.remove::<Score>();

        // Then
        assert_eq!(taken, Some(Score(3)));
        assert!(!resources.contains::<Score>());
    }

    #[test]
    fn get_mut_mutates_in_place() {
        // Given
        let mut resources = Resources::new();
        resources.insert(Score(0));

        // When
        resources.get_mut::<Score>().unwrap().0 += 10;

        // Then
        assert_eq!(resources.expect::<Score>(), &Score(10));
    }

    #[test]
    #[should_panic(expected = "was never inserted")]
    fn expect_of_missing_resource_is_fatal() {
        let resources = Resources::new();
        resources.expect::<Score>();
    }
}
