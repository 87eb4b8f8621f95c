//! Shared world reference parameter.
//!
//! `&World` gives a system read access to everything: direct component
//! lookups, resource reads, event inspection. It claims the whole world, so it
//! conflicts with every other parameter and must be a system's only one.
//! Systems that need to mutate take `&mut World` and become exclusive instead.

use crate::{
    system::{CommandBuffer, access::Access, param::Parameter},
    world::World,
};

impl Parameter for &World {
    type Value<'w, 's> = &'w World;
    type State = ();

    fn build_state(_world: &mut World) -> Self::State {}

    fn access(_world: &World) -> Access {
        Access::world()
    }

    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        _state: &'s mut Self::State,
        _commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        world
    }
}
