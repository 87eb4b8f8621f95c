//! Deferred structural commands.
//!
//! Systems cannot mutate storage structurally while a query iterates it, so
//! structural changes are recorded as [`Command`]s in a [`CommandBuffer`] and
//! applied when the phase flushes, in push order. The queue is lock-free, so a
//! buffer can be shared by reference across parameters.

use crossbeam::queue::SegQueue;

use crate::{
    component::{BoxedBundle, Spec},
    entity::Entity,
    world::World,
};

/// One recorded structural mutation.
pub enum Command {
    /// Place a pre-allocated entity into storage with its components.
    Spawn {
        entity: Entity,
        bundle: BoxedBundle,
    },
    /// Remove an entity and drop its values.
    Despawn { entity: Entity },
    /// Add components to an existing entity.
    Add {
        entity: Entity,
        bundle: BoxedBundle,
    },
    /// Remove components from an existing entity.
    Remove { entity: Entity, spec: Spec },
    /// Arbitrary deferred world mutation.
    Run(Box<dyn FnOnce(&mut World) + Send>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Spawn { entity, .. } => f.debug_struct("Spawn").field("entity", entity).finish(),
            Command::Despawn { entity } => f.debug_struct("Despawn").field("entity", entity).finish(),
            Command::Add { entity, .. } => f.debug_struct("Add").field("entity", entity).finish(),
            Command::Remove { entity, spec } => f
                .debug_struct("Remove")
                .field("entity", entity)
                .field("spec", spec)
                .finish(),
            Command::Run(_) => f.write_str("Run"),
        }
    }
}

/// An ordered queue of deferred commands.
#[derive(Default)]
pub struct CommandBuffer {
    commands: SegQueue<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one command.
    pub fn push(&self, command: Command) {
        self.commands.push(command);
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Apply every queued command to `world`, in push order.
    pub fn flush(&self, world: &mut World) {
        let mut applied = 0;
        while let Some(command) = self.commands.pop() {
            match command {
                Command::Spawn { entity, bundle } => world.spawn_at(entity, bundle),
                Command::Despawn { entity } => world.despawn(entity),
                Command::Add { entity, bundle } => world.add_boxed(entity, bundle),
                Command::Remove { entity, spec } => world.remove_by_spec(entity, &spec),
                Command::Run(run) => run(world),
            }
            applied += 1;
        }
        if applied > 0 {
            log::debug!("flushed {applied} deferred commands");
        }
    }
}
