//! Query system parameter.

use std::marker::PhantomData;

use crate::{
    query,
    query::{Data, Filter},
    system::{CommandBuffer, access::Access, param::Parameter},
    world::World,
};

/// A query as a system argument.
///
/// `D` is the data tuple each match yields, `F` an optional structural filter:
///
/// ```rust,ignore
/// fn movement(query: Query<(&Velocity, &mut Position)>) {
///     for (velocity, position) in query {
///         position.x += velocity.dx;
///     }
/// }
///
/// fn thaw(query: Query<Entity, With<Frozen>>, commands: Commands) {
///     for entity in query {
///         commands.remove_components::<Frozen>(entity);
///     }
/// }
/// ```
///
/// The query is invoked when the system runs; iterating it consumes the
/// results for that run.
pub struct Query<'w, D: Data, F: Filter = ()> {
    inner: query::Iter<'w, D>,
    _filter: PhantomData<fn() -> F>,
}

impl<'w, D: Data, F: Filter> Query<'w, D, F> {
    /// Number of matches in this run.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<'w, D: Data, F: Filter> Iterator for Query<'w, D, F> {
    type Item = D::Data<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'w, D: Data, F: Filter> ExactSizeIterator for Query<'w, D, F> {}

impl<D: Data + 'static, F: Filter + 'static> Parameter for Query<'_, D, F> {
    type Value<'w, 's> = Query<'w, D, F>;
    type State = query::Query<D, F>;

    fn build_state(world: &mut World) -> Self::State {
        query::Query::new(world.types())
    }

    fn access(world: &World) -> Access {
        Access::from_data_spec(&D::spec(world.types()), world.types())
    }

    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        state: &'s mut Self::State,
        _commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        Query {
            inner: state.invoke(world),
            _filter: PhantomData,
        }
    }
}
