//! System parameters.
//!
//! A [`Parameter`] is anything a plain function can take as an argument to
//! become a system: queries, resource borrows, event readers and writers,
//! deferred commands. Each parameter declares its world access up front, builds
//! any state it needs once at system construction, and extracts its runtime
//! value from the world on every run.
//!
//! The two GAT lifetimes separate the world borrow (`'w`) from the parameter
//! state borrow (`'s`): an event reader's channel reference lives in the world,
//! its cursor lives in the system's state.

mod commands;
mod event;
mod query;
mod resource;
mod world_ref;

pub use commands::{Commands, EntityCommands};
pub use event::{EventReader, EventWriter};
pub use query::Query;
pub use resource::{Res, ResMut};

use crate::{
    system::{CommandBuffer, access::Access},
    world::World,
};

/// A value extractable from the world as a system function argument.
pub trait Parameter {
    /// The runtime value handed to the function, generic over the world
    /// lifetime `'w` and the state lifetime `'s`.
    type Value<'w, 's>: Parameter<State = Self::State>;

    /// Per-system state surviving between runs.
    type State: 'static;

    /// Build this parameter's state once, at system construction.
    fn build_state(world: &mut World) -> Self::State;

    /// Declare the world access this parameter needs.
    fn access(world: &World) -> Access;

    /// Extract the runtime value.
    ///
    /// # Safety
    ///
    /// The caller hands out aliased `&mut World` re-borrows, one per parameter
    /// of the system. This is sound only because the merged access declaration
    /// was checked for conflicts at system construction, so the parameters
    /// touch disjoint data.
    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        state: &'s mut Self::State,
        commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's>;
}
