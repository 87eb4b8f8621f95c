//! Archetype-based entity component storage and execution runtime.
//!
//! Entities are lightweight generational handles; their component data lives
//! in archetypes, one per distinct component set, stored column-per-type with
//! rows aligned across columns. Systems are plain functions whose parameters
//! declare what they touch; a [`Schedule`] runs them phase by phase in an
//! order satisfying their constraints.
//!
//! ```rust,ignore
//! use ember_engine::prelude::*;
//!
//! #[derive(Component, Clone, Default)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Component, Clone, Default)]
//! struct Velocity { dx: f32, dy: f32 }
//!
//! fn movement(query: Query<(&Velocity, &mut Position)>) {
//!     for (velocity, position) in query {
//!         position.x += velocity.dx;
//!         position.y += velocity.dy;
//!     }
//! }
//!
//! let mut world = World::new(WorldId::new(0));
//! world.spawn((Position::default(), Velocity { dx: 1.0, dy: 0.0 }));
//!
//! define_phase!(Update);
//! let mut schedule = Schedule::new();
//! schedule.add_system(Update, movement, &mut world);
//! schedule.run(Update, &mut world);
//! ```

// Lets the derive macros emit ::ember_engine paths that resolve both inside
// and outside this crate.
extern crate self as ember_engine;

pub mod component;
pub mod entity;
pub mod event;
pub mod query;
pub mod registry;
pub mod resource;
pub mod schedule;
pub mod storage;
pub mod system;
pub(crate) mod util;
pub mod value;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use event::Event;
pub use resource::Resource;
pub use schedule::{Schedule, Sequence};
pub use world::{Id as WorldId, World};

pub use query::{With, Without};
pub use system::{
    Commands, EventReader, EventWriter, IntoSystem, Parameter, Query, Res, ResMut, System,
};

pub use ember_macros::{Component, Event, Resource};

/// One-stop imports for applications built on the engine.
pub mod prelude {
    pub use crate::{
        Commands, Component, Entity, Event, EventReader, EventWriter, IntoSystem, Query, Res,
        ResMut, Resource, Schedule, Sequence, With, Without, World, WorldId, define_phase,
        define_set,
        schedule::{IntoSystemConfig, SetLabel},
    };
}
