//! Deferred commands system parameter.

use crate::{
    component::{Bundle, BoxedBundle, IntoSpec},
    entity::{Allocator, Entity},
    registry::TypeRegistry,
    system::{Command, CommandBuffer, access::Access, param::Parameter},
    world::World,
};

/// Records structural changes for application after the current phase.
///
/// Spawned entities get their handle immediately; the components land when the
/// phase flushes. Commands apply in the order they were recorded.
///
/// ```rust,ignore
/// fn cull(query: Query<(Entity, &Health)>, commands: Commands) {
///     for (entity, health) in query {
///         if health.current == 0 {
///             commands.despawn(entity);
///         }
///     }
/// }
/// ```
pub struct Commands<'w> {
    buffer: &'w CommandBuffer,
    allocator: &'w Allocator,
    registry: &'w TypeRegistry,
}

impl Commands<'_> {
    /// Queue a spawn. The returned handle is live for further commands in the
    /// same buffer, and resolves in the world after the flush.
    pub fn spawn<B: Bundle>(&self, bundle: B) -> Entity {
        let entity = self.allocator.alloc();
        self.buffer.push(Command::Spawn {
            entity,
            bundle: BoxedBundle::new(bundle, self.registry),
        });
        entity
    }

    /// Queue a despawn.
    pub fn despawn(&self, entity: Entity) {
        self.buffer.push(Command::Despawn { entity });
    }

    /// Target an existing entity for a chain of commands.
    pub fn entity(&self, entity: Entity) -> EntityCommands<'_> {
        EntityCommands {
            commands: self,
            entity,
        }
    }

    /// Queue a component add.
    pub fn add_components<B: Bundle>(&self, entity: Entity, bundle: B) {
        self.buffer.push(Command::Add {
            entity,
            bundle: BoxedBundle::new(bundle, self.registry),
        });
    }

    /// Queue a component remove.
    pub fn remove_components<S: IntoSpec>(&self, entity: Entity) {
        self.buffer.push(Command::Remove {
            entity,
            spec: S::into_spec(self.registry),
        });
    }

    /// Queue an arbitrary world mutation.
    pub fn run(&self, run: impl FnOnce(&mut World) + Send + 'static) {
        self.buffer.push(Command::Run(Box::new(run)));
    }
}

/// Command recording scoped to one entity.
pub struct EntityCommands<'c> {
    commands: &'c Commands<'c>,
    entity: Entity,
}

impl EntityCommands<'_> {
    /// The targeted entity.
    #[inline]
    pub fn id(&self) -> Entity {
        self.entity
    }

    /// Queue a component add on the targeted entity.
    pub fn add<B: Bundle>(&self, bundle: B) -> &Self {
        self.commands.add_components(self.entity, bundle);
        self
    }

    /// Queue a component remove on the targeted entity.
    pub fn remove<S: IntoSpec>(&self) -> &Self {
        self.commands.remove_components::<S>(self.entity);
        self
    }

    /// Queue a despawn of the targeted entity.
    pub fn despawn(&self) {
        self.commands.despawn(self.entity);
    }
}

impl Parameter for Commands<'_> {
    type Value<'w, 's> = Commands<'w>;
    type State = ();

    fn build_state(_world: &mut World) -> Self::State {}

    fn access(_world: &World) -> Access {
        // Recording touches nothing; mutation happens at the flush.
        Access::none()
    }

    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        _state: &'s mut Self::State,
        commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        let world: &'w World = world;
        Commands {
            buffer: commands,
            allocator: world.allocator(),
            registry: world.types(),
        }
    }
}
