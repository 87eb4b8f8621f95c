//! Component model.
//!
//! A component is plain data attached to an entity. The runtime requires
//! [`Default`] so columns can grow a placeholder row during migration, and
//! [`Clone`] so values can move between archetypes by copy-construction.
//! Implement it with `#[derive(Component)]`.

pub mod bundle;
pub mod spec;

pub use bundle::{BoxedBundle, Bundle, BundleTarget};
pub use spec::{IntoSpec, Spec};

/// Marker trait for types stored per entity in archetype columns.
pub trait Component: Clone + Default + Send + Sync + 'static {}
