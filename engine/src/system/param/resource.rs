//! Resource system parameters.

use std::ops::{Deref, DerefMut};

use crate::{
    resource::Resource,
    system::{CommandBuffer, access::Access, param::Parameter},
    world::World,
};

/// Shared borrow of a resource.
///
/// Extraction panics if the resource was never inserted; a system that can run
/// without it should take `Option<Res<R>>` instead.
pub struct Res<'w, R: Resource> {
    value: &'w R,
}

impl<R: Resource> Deref for Res<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.value
    }
}

/// Mutable borrow of a resource.
pub struct ResMut<'w, R: Resource> {
    value: &'w mut R,
}

impl<R: Resource> Deref for ResMut<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.value
    }
}

impl<R: Resource> DerefMut for ResMut<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.value
    }
}

impl<R: Resource> Parameter for Res<'_, R> {
    type Value<'w, 's> = Res<'w, R>;
    type State = ();

    fn build_state(world: &mut World) -> Self::State {
        world.types().register_resource::<R>();
    }

    fn access(world: &World) -> Access {
        let mut access = Access::none();
        access.add_read(world.types().register_resource::<R>());
        access
    }

    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        _state: &'s mut Self::State,
        _commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        Res {
            value: world.resources().expect::<R>(),
        }
    }
}

impl<R: Resource> Parameter for ResMut<'_, R> {
    type Value<'w, 's> = ResMut<'w, R>;
    type State = ();

    fn build_state(world: &mut World) -> Self::State {
        world.types().register_resource::<R>();
    }

    fn access(world: &World) -> Access {
        let mut access = Access::none();
        access.add_write(world.types().register_resource::<R>());
        access
    }

    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        _state: &'s mut Self::State,
        _commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        ResMut {
            value: world.resources_mut().expect_mut::<R>(),
        }
    }
}

impl<R: Resource> Parameter for Option<Res<'_, R>> {
    type Value<'w, 's> = Option<Res<'w, R>>;
    type State = ();

    fn build_state(world: &mut World) -> Self::State {
        world.types().register_resource::<R>();
    }

    fn access(world: &World) -> Access {
        <Res<'_, R>>::access(world)
    }

    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        _state: &'s mut Self::State,
        _commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        world.resources().get::<R>().map(|value| Res { value })
    }
}

impl<R: Resource> Parameter for Option<ResMut<'_, R>> {
    type Value<'w, 's> = Option<ResMut<'w, R>>;
    type State = ();

    fn build_state(world: &mut World) -> Self::State {
        world.types().register_resource::<R>();
    }

    fn access(world: &World) -> Access {
        <ResMut<'_, R>>::access(world)
    }

    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        _state: &'s mut Self::State,
        _commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        world
            .resources_mut()
            .get_mut::<R>()
            .map(|value| ResMut { value })
    }
}

#[cfg(test)]
mod tests {
    use ember_macros::Resource;

    use super::*;
    use crate::world;

    #[derive(Resource, Debug, PartialEq)]
    struct Clock(u64);

    #[test]
    fn res_reads_and_res_mut_writes() {
        // Given
        let mut world = World::new(world::Id::new(0));
        world.insert_resource(Clock(5));
        let buffer = CommandBuffer::new();

        // When
        let mut clock = unsafe { <ResMut<Clock>>::extract(&mut world, &mut (), &buffer) };
        clock.0 += 1;

        // Then
        let clock = unsafe { <Res<Clock>>::extract(&mut world, &mut (), &buffer) };
        assert_eq!(*clock, Clock(6));
    }

    #[test]
    fn access_distinguishes_read_from_write() {
        // Given
        let world = World::new(world::Id::new(0));

        // When
        let read = <Res<Clock>>::access(&world);
        let write = <ResMut<Clock>>::access(&world);

        // Then
        let id = world.types().get::<Clock>().unwrap();
        assert!(read.reads(id) && !read.writes(id));
        assert!(write.writes(id));
        assert!(read.conflicts_with(&write));
    }

    #[test]
    fn optional_res_is_none_when_absent() {
        // Given
        let mut world = World::new(world::Id::new(0));
        let buffer = CommandBuffer::new();

        // When
        let clock = unsafe { <Option<Res<Clock>>>::extract(&mut world, &mut (), &buffer) };

        // Then
        assert!(clock.is_none());
    }

    #[test]
    #[should_panic(expected = "was never inserted")]
    fn missing_required_resource_is_fatal() {
        let mut world = World::new(world::Id::new(0));
        let buffer = CommandBuffer::new();
        unsafe { <Res<Clock>>::extract(&mut world, &mut (), &buffer) };
    }
}
