//! Phases: named execution stages holding an ordered list of systems.
//!
//! A phase owns its systems, the set configurations that order them, and a
//! command buffer that is flushed into the world after every run. Execution
//! is strictly sequential in the sorted order; the sort is computed lazily
//! and cached until the phase changes.

use std::{any::TypeId as StdTypeId, collections::HashMap};

use crate::{
    schedule::graph::{self, Node, SetConfig, SetId, SystemConfig},
    system::CommandBuffer,
    world::World,
};

/// Opaque phase identifier derived from a label type.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Id(StdTypeId);

impl Id {
    #[inline]
    pub const fn new<L: Label>() -> Self {
        Self(StdTypeId::of::<L>())
    }
}

/// Marker trait for phase identifiers.
///
/// Phase labels are zero-sized types identifying phases in a
/// [`Schedule`](crate::schedule::Schedule). Define them with
/// [`define_phase!`]:
///
/// ```rust,ignore
/// define_phase!(Update, Render);
/// ```
pub trait Label: 'static {
    /// Human-readable phase name for diagnostics.
    fn name() -> &'static str;

    /// The phase's id.
    fn id(self) -> Id;
}

/// Defines one or more phase label types.
#[macro_export]
macro_rules! define_phase {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct $name;

            impl $crate::schedule::Label for $name {
                #[inline]
                fn name() -> &'static str {
                    stringify!($name)
                }

                fn id(self) -> $crate::schedule::Id {
                    $crate::schedule::Id::new::<Self>()
                }
            }
        )*
    };
}

/// A named execution stage containing ordered systems.
///
/// Systems run one at a time in the order produced by the constraint sort.
/// Structural commands recorded during the run are applied when the last
/// system finishes, so every system in a phase observes the same world
/// structure.
#[derive(Default)]
pub struct Phase {
    nodes: Vec<Node>,
    sets: HashMap<SetId, SetConfig>,
    /// Cached sort, invalidated whenever a system or set config is added.
    order: Option<Vec<usize>>,
    commands: CommandBuffer,
}

impl Phase {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a configured system, building it against the world.
    pub fn add_system(&mut self, config: SystemConfig, world: &mut World) {
        let system = (config.build)(world);
        self.nodes.push(Node {
            name: config.name,
            system,
            before: config.before,
            after: config.after,
            sets: config.sets,
        });
        self.order = None;
    }

    /// Merges ordering constraints for a set into this phase.
    pub fn configure_set(&mut self, config: SetConfig) {
        self.sets
            .entry(config.set)
            .or_insert_with(|| SetConfig::empty(config.set))
            .merge(config);
        self.order = None;
    }

    /// Number of systems in this phase.
    #[inline]
    pub fn systems_len(&self) -> usize {
        self.nodes.len()
    }

    /// Runs every system in sorted order, then flushes recorded commands.
    pub fn run(&mut self, world: &mut World) {
        if self.order.is_none() {
            let order = graph::sort(&self.nodes, &self.sets);
            log::debug!("sorted {} systems", order.len());
            self.order = Some(order);
        }
        let order = self.order.clone().unwrap_or_default();
        for &index in &order {
            let node = &mut self.nodes[index];
            node.system.run(world, &self.commands);
        }
        self.commands.flush(world);
    }
}

/// A reusable ordered list of phases for [`Schedule::run_sequence`](crate::schedule::Schedule::run_sequence).
///
/// ```rust,ignore
/// let frame = Sequence::new().then(Update).then(Render);
/// loop {
///     schedule.run_sequence(&frame, &mut world);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    phases: Vec<Id>,
}

impl Sequence {
    #[inline]
    pub fn new() -> Self {
        Self { phases: Vec::new() }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            phases: Vec::with_capacity(capacity),
        }
    }

    /// Adds a phase to the end of the sequence, chaining.
    #[inline]
    pub fn then<L: Label>(mut self, label: L) -> Self {
        self.phases.push(label.id());
        self
    }

    /// Adds a phase in place, for conditional sequence building.
    #[inline]
    pub fn push<L: Label>(&mut self, label: L) {
        self.phases.push(label.id());
    }

    pub fn phases(&self) -> &[Id] {
        &self.phases
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.phases.clear();
    }
}
