//! Queries over entity storage.
//!
//! A [`Query`] pairs a data tuple `D` (what each match yields) with a filter
//! `F` (structural conditions that narrow matching without fetching anything).
//! Matching is archetype-level: an archetype matches when it carries every
//! required component of `D` and of the filter's `With` conditions, and none of
//! the filter's `Without` components. Matching is recomputed on every
//! invocation, so archetypes created since the last run are always seen.
//!
//! ```rust,ignore
//! let query = world.query::<(Entity, &Position, &mut Velocity)>();
//! for (entity, position, velocity) in query.invoke(&mut world) {
//!     velocity.dx += position.x * 0.1;
//! }
//! ```

pub mod data;
pub mod filter;
pub mod iter;
pub mod selector;

pub use data::{Data, DataSpec};
pub use filter::{Filter, FilterSpec, With, Without};
pub use iter::Iter;
pub use selector::{Selector, SelectorSpec};

use std::marker::PhantomData;

use crate::{registry::TypeRegistry, world::World};

/// A reusable query plan for data tuple `D` under filter `F`.
pub struct Query<D: Data, F: Filter = ()> {
    data: DataSpec,
    filter: FilterSpec,
    _marker: PhantomData<fn() -> (D, F)>,
}

impl<D: Data, F: Filter> Query<D, F> {
    /// Build the query plan, registering any unseen component types.
    ///
    /// # Panics
    ///
    /// Panics if the data tuple names the same component more than once; such
    /// a tuple would alias one column within a single match.
    pub fn new(registry: &TypeRegistry) -> Self {
        let data = D::spec(registry);
        assert!(
            data.is_valid(),
            "query data tuple names a component more than once"
        );
        Self {
            data,
            filter: F::spec(registry),
            _marker: PhantomData,
        }
    }

    /// The flattened selector list of `D`.
    #[inline]
    pub fn data_spec(&self) -> &DataSpec {
        &self.data
    }

    /// The structural filter conditions.
    #[inline]
    pub fn filter_spec(&self) -> &FilterSpec {
        &self.filter
    }

    /// Run the query, yielding every current match.
    pub fn invoke<'w>(&self, world: &'w mut World) -> Iter<'w, D> {
        let registry = world.types();
        let mut required = self.data.required_mask(registry);
        let mut excluded = fixedbitset::FixedBitSet::with_capacity(registry.len());
        for id in self.filter.with.ids() {
            required.grow(id.index() + 1);
            required.insert(id.index());
        }
        for id in self.filter.without.ids() {
            excluded.insert(id.index());
        }

        let matching = world.storage().archetypes().matching(&required, &excluded);
        log::trace!(
            "query over {} selectors matched {} archetypes",
            self.data.selectors().len(),
            matching.len()
        );
        Iter::new(world.storage_mut().archetypes_mut(), matching)
    }

    /// The first current match.
    ///
    /// # Panics
    ///
    /// Panics when nothing matches. Callers that can tolerate an empty result
    /// use [`try_first`](Query::try_first).
    pub fn first<'w>(&self, world: &'w mut World) -> D::Data<'w> {
        match self.invoke(world).next() {
            Some(data) => data,
            None => {
                log::error!("first() on a query with no matching rows");
                panic!("query matched no rows");
            }
        }
    }

    /// The first current match, if any.
    pub fn try_first<'w>(&self, world: &'w mut World) -> Option<D::Data<'w>> {
        self.invoke(world).next()
    }

    /// Number of current matches, without fetching any values.
    pub fn count(&self, world: &mut World) -> usize {
        self.invoke(world).len()
    }

    /// Build and immediately run a query once.
    pub fn one_shot(world: &mut World) -> Iter<'_, D> {
        let query = Self::new(world.types());
        query.invoke(world)
    }
}
