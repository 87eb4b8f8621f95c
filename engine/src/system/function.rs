//! Function systems and parameter extraction.
//!
//! Plain functions become systems when every argument is a [`Parameter`]:
//!
//! ```rust,ignore
//! fn movement(query: Query<(&Velocity, &mut Position)>) {
//!     for (velocity, position) in query {
//!         position.x += velocity.dx;
//!     }
//! }
//!
//! let system = movement.into_system(&mut world);
//! ```
//!
//! The bridge between the function's elided-lifetime signature and the runtime
//! values is a higher-ranked bound: the function must accept its parameter
//! types at any world lifetime, so the extracted `Value<'w, '_>` types can be
//! passed in when the system runs. Functions taking `&mut World` skip
//! extraction entirely and become exclusive systems.

use crate::{
    all_tuples,
    system::{Access, CommandBuffer, System, param::Parameter},
    world::World,
};

/// Callables whose arguments are all system parameters.
///
/// `Params` is the tuple of parameter types from the signature, `State` the
/// tuple of their per-system states. Implemented by macro for arities 0
/// through 26; never implemented by hand.
pub trait WithSystemParams<Params, State>: 'static {
    /// Merge the access declarations of every parameter.
    ///
    /// # Panics
    ///
    /// Panics if two parameters conflict, such as two mutable queries over the
    /// same component.
    fn access(world: &World) -> Access;

    /// Build the state tuple, one entry per parameter.
    fn build_state(world: &mut World) -> State;

    /// Extract every parameter and call the function.
    ///
    /// # Safety
    ///
    /// Each parameter receives an aliased `&mut World` re-borrow. Sound only
    /// because [`access`](WithSystemParams::access) rejected conflicting
    /// parameter sets at system construction and execution is sequential.
    unsafe fn run(&mut self, world: &mut World, state: &mut State, commands: &CommandBuffer);
}

impl<Func> WithSystemParams<(), ()> for Func
where
    Func: FnMut() + 'static,
{
    fn access(_world: &World) -> Access {
        Access::none()
    }

    fn build_state(_world: &mut World) {}

    unsafe fn run(&mut self, _world: &mut World, _state: &mut (), _commands: &CommandBuffer) {
        self();
    }
}

macro_rules! system_param_function {
    ($($param:ident),*) => {
        impl<Func, $($param: Parameter, )*> WithSystemParams<($($param, )*), ($($param::State,)*)> for Func
        where
            Func: 'static,
            // The function must accept both its signature types (elided
            // lifetimes) and the extracted values at any world lifetime.
            for<'w> &'w mut Func: FnMut($($param),*) + FnMut($($param::Value<'w, '_>),*),
        {
            fn access(world: &World) -> Access {
                let mut access = Access::none();
                $(
                    let required = $param::access(world);
                    assert!(
                        !access.conflicts_with(&required),
                        "conflicting access between system parameters"
                    );
                    access.merge(&required);
                )*
                access
            }

            fn build_state(world: &mut World) -> ($(<$param as Parameter>::State,)*) {
                ($($param::build_state(world),)*)
            }

            unsafe fn run(&mut self, world: &mut World, state: &mut ($($param::State,)*), commands: &CommandBuffer) {
                // Indirection needed because macro hygiene prevents calling
                // self($($param),*) directly.
                #[allow(clippy::too_many_arguments, non_snake_case)]
                fn call_it<$($param),*>(mut func: impl FnMut($($param),*), $($param: $param),*) {
                    func($($param),*);
                }

                #[allow(non_snake_case)]
                let ($($param,)*) = state;

                $(
                    // SAFETY: aliased world re-borrows, one per parameter. The
                    // access merge rejected conflicting parameter sets, so the
                    // extracted values touch disjoint data.
                    #[allow(non_snake_case)]
                    let $param = unsafe { $param::extract(&mut *(world as *mut World), $param, commands) };
                )*

                call_it(self, $($param),*);
            }
        }
    };
}

all_tuples!(system_param_function);

/// Marker distinguishing `FnMut(&mut World)` from parameter functions in
/// [`IntoSystem`].
pub struct WorldFnMarker;

/// Marker for passing an already-built [`System`] where an [`IntoSystem`] is
/// expected.
pub struct SystemMarker;

/// Conversion into a built [`System`].
///
/// The marker type parameter disambiguates the blanket impls for the different
/// callable shapes; it is always inferred.
pub trait IntoSystem<Marker> {
    fn into_system(self, world: &mut World) -> System;
}

impl<F> IntoSystem<WorldFnMarker> for F
where
    F: FnMut(&mut World) + 'static,
{
    fn into_system(self, _world: &mut World) -> System {
        System::exclusive(self)
    }
}

impl IntoSystem<SystemMarker> for System {
    fn into_system(self, _world: &mut World) -> System {
        self
    }
}

impl<Func, Params, State> IntoSystem<(Params, State)> for Func
where
    Func: WithSystemParams<Params, State> + 'static,
    Params: 'static,
    State: 'static,
{
    fn into_system(mut self, world: &mut World) -> System {
        let access = Func::access(world);
        let mut state = Func::build_state(world);
        System::deferred(access, move |world, commands| {
            // SAFETY: execution is sequential and the access set was conflict
            // checked when this system was built.
            unsafe { self.run(world, &mut state, commands) }
        })
    }
}
