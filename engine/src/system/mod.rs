//! Systems: units of work run against the world.
//!
//! A [`System`] is built once from anything implementing [`IntoSystem`]: a
//! function or closure whose arguments are all system parameters (queries,
//! resources, events, commands), or a `FnMut(&mut World)` for exclusive access.
//! Parameter state is created at build time; the boxed run closure captures it.
//!
//! Functions with parameters run in deferred mode: they receive the world plus
//! a command buffer for structural changes, which the owning phase applies
//! after the system returns. Exclusive systems mutate the world directly.

pub mod access;
pub mod command;
pub mod function;
pub mod param;

pub use access::Access;
pub use command::{Command, CommandBuffer};
pub use function::{IntoSystem, WithSystemParams};
pub use param::{Commands, EntityCommands, EventReader, EventWriter, Parameter, Query, Res, ResMut};

use crate::world::World;

/// How a built system executes.
pub enum RunMode {
    /// Direct mutable access to the world.
    Exclusive(Box<dyn FnMut(&mut World)>),
    /// World access through parameters, structural changes through the buffer.
    Deferred(Box<dyn FnMut(&mut World, &CommandBuffer)>),
}

/// A built, runnable system.
pub struct System {
    access: Access,
    run_mode: RunMode,
}

impl System {
    /// Build an exclusive system.
    pub fn exclusive(run: impl FnMut(&mut World) + 'static) -> Self {
        Self {
            access: Access::world(),
            run_mode: RunMode::Exclusive(Box::new(run)),
        }
    }

    /// Build a deferred system with a declared access set.
    pub fn deferred(access: Access, run: impl FnMut(&mut World, &CommandBuffer) + 'static) -> Self {
        Self {
            access,
            run_mode: RunMode::Deferred(Box::new(run)),
        }
    }

    /// The types this system declared it touches.
    #[inline]
    pub fn access(&self) -> &Access {
        &self.access
    }

    /// Execute the system once. Deferred commands land in `commands`; the
    /// caller applies them.
    pub fn run(&mut self, world: &mut World, commands: &CommandBuffer) {
        match &mut self.run_mode {
            RunMode::Exclusive(run) => run(world),
            RunMode::Deferred(run) => run(world, commands),
        }
    }
}
