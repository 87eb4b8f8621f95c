//! Ordering constraints and the dependency sort for systems within a phase.
//!
//! Systems carry a stable name plus `before`/`after` relations against other
//! named systems and against sets. Sets are zero-sized marker types grouping
//! systems so a whole stage can be ordered with one constraint:
//!
//! ```rust,ignore
//! define_set!(Physics, Rendering);
//!
//! schedule.add_system(Update, integrate.named("integrate").in_set(Physics), &mut world);
//! schedule.add_system(Update, draw.named("draw").in_set(Rendering), &mut world);
//! schedule.configure_set(Update, Rendering.after_set(Physics));
//! ```
//!
//! The sort is Kahn's algorithm over system indices. Set constraints are
//! expanded onto member systems before sorting, so the graph only ever
//! contains system-to-system edges.

use std::{
    any::TypeId as StdTypeId,
    collections::{HashMap, VecDeque},
};

use crate::{
    system::{IntoSystem, System},
    world::World,
};

/// Opaque identifier for a system set, derived from its marker type.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct SetId(StdTypeId);

impl SetId {
    #[inline]
    pub const fn new<S: SetLabel>() -> Self {
        Self(StdTypeId::of::<S>())
    }
}

/// Marker trait for system set identifiers.
///
/// Define sets with [`define_set!`]; the builder methods produce a
/// [`SetConfig`] for [`Schedule::configure_set`](crate::schedule::Schedule::configure_set).
pub trait SetLabel: Sized + 'static {
    /// Human-readable set name for diagnostics.
    fn name() -> &'static str;

    /// The set's id.
    fn id(self) -> SetId;

    /// Order every member of this set before the named system.
    fn before(self, name: &'static str) -> SetConfig {
        SetConfig::new(self.id()).before(name)
    }

    /// Order every member of this set after the named system.
    fn after(self, name: &'static str) -> SetConfig {
        SetConfig::new(self.id()).after(name)
    }

    /// Order every member of this set before every member of another set.
    fn before_set<O: SetLabel>(self, other: O) -> SetConfig {
        SetConfig::new(self.id()).before_set(other)
    }

    /// Order every member of this set after every member of another set.
    fn after_set<O: SetLabel>(self, other: O) -> SetConfig {
        SetConfig::new(self.id()).after_set(other)
    }
}

/// Defines one or more system set marker types.
#[macro_export]
macro_rules! define_set {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct $name;

            impl $crate::schedule::SetLabel for $name {
                #[inline]
                fn name() -> &'static str {
                    stringify!($name)
                }

                fn id(self) -> $crate::schedule::SetId {
                    $crate::schedule::SetId::new::<Self>()
                }
            }
        )*
    };
}

/// One end of an ordering constraint: a named system or a whole set.
#[derive(Debug, Clone, Copy)]
pub enum Anchor {
    System(&'static str),
    Set(SetId),
}

/// A system plus its name, ordering constraints, and set memberships.
///
/// Built from any [`IntoSystem`] value via the [`IntoSystemConfig`] builder
/// methods. The system itself is constructed lazily when the config is added
/// to a phase, since construction needs the world.
pub struct SystemConfig {
    pub(crate) name: &'static str,
    pub(crate) build: Box<dyn FnOnce(&mut World) -> System>,
    pub(crate) before: Vec<Anchor>,
    pub(crate) after: Vec<Anchor>,
    pub(crate) sets: Vec<SetId>,
}

impl SystemConfig {
    fn new(name: &'static str, build: Box<dyn FnOnce(&mut World) -> System>) -> Self {
        Self {
            name,
            build,
            before: Vec::new(),
            after: Vec::new(),
            sets: Vec::new(),
        }
    }
}

/// Marker for the [`IntoSystemConfig`] impl on [`SystemConfig`] itself.
pub struct ConfigMarker;

/// Conversion into a [`SystemConfig`], with builder methods for naming and
/// ordering. Implemented for every [`IntoSystem`] value, so plain functions
/// and closures take ordering constraints directly:
///
/// ```rust,ignore
/// schedule.add_system(Update, movement.named("movement"), &mut world);
/// schedule.add_system(Update, collide.named("collide").after("movement"), &mut world);
/// ```
pub trait IntoSystemConfig<M>: Sized {
    fn into_config(self) -> SystemConfig;

    /// Assigns a stable name used by `before`/`after` constraints and
    /// diagnostics. Unnamed systems default to their type name.
    fn named(self, name: &'static str) -> SystemConfig {
        let mut config = self.into_config();
        config.name = name;
        config
    }

    /// Orders this system before the named one.
    fn before(self, name: &'static str) -> SystemConfig {
        let mut config = self.into_config();
        config.before.push(Anchor::System(name));
        config
    }

    /// Orders this system after the named one.
    fn after(self, name: &'static str) -> SystemConfig {
        let mut config = self.into_config();
        config.after.push(Anchor::System(name));
        config
    }

    /// Orders this system before every member of a set.
    fn before_set<S: SetLabel>(self, set: S) -> SystemConfig {
        let mut config = self.into_config();
        config.before.push(Anchor::Set(set.id()));
        config
    }

    /// Orders this system after every member of a set.
    fn after_set<S: SetLabel>(self, set: S) -> SystemConfig {
        let mut config = self.into_config();
        config.after.push(Anchor::Set(set.id()));
        config
    }

    /// Adds this system to a set.
    fn in_set<S: SetLabel>(self, set: S) -> SystemConfig {
        let mut config = self.into_config();
        config.sets.push(set.id());
        config
    }
}

impl<M, S> IntoSystemConfig<M> for S
where
    S: IntoSystem<M> + 'static,
{
    fn into_config(self) -> SystemConfig {
        SystemConfig::new(
            std::any::type_name::<S>(),
            Box::new(move |world| self.into_system(world)),
        )
    }
}

impl IntoSystemConfig<ConfigMarker> for SystemConfig {
    fn into_config(self) -> SystemConfig {
        self
    }
}

/// Ordering constraints applied to every member of a set.
#[derive(Debug, Clone)]
pub struct SetConfig {
    pub(crate) set: SetId,
    pub(crate) before: Vec<Anchor>,
    pub(crate) after: Vec<Anchor>,
}

impl SetConfig {
    fn new(set: SetId) -> Self {
        Self {
            set,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn before(mut self, name: &'static str) -> Self {
        self.before.push(Anchor::System(name));
        self
    }

    pub fn after(mut self, name: &'static str) -> Self {
        self.after.push(Anchor::System(name));
        self
    }

    pub fn before_set<O: SetLabel>(mut self, other: O) -> Self {
        self.before.push(Anchor::Set(other.id()));
        self
    }

    pub fn after_set<O: SetLabel>(mut self, other: O) -> Self {
        self.after.push(Anchor::Set(other.id()));
        self
    }

    pub(crate) fn merge(&mut self, other: SetConfig) {
        self.before.extend(other.before);
        self.after.extend(other.after);
    }

    pub(crate) fn empty(set: SetId) -> Self {
        Self::new(set)
    }
}

/// One scheduled system inside a phase.
pub(crate) struct Node {
    pub(crate) name: &'static str,
    pub(crate) system: System,
    pub(crate) before: Vec<Anchor>,
    pub(crate) after: Vec<Anchor>,
    pub(crate) sets: Vec<SetId>,
}

/// Sorts the nodes into an execution order respecting every constraint.
///
/// Returns indices into `nodes`. Ties are broken by insertion order, so
/// unconstrained systems run in the order they were added.
///
/// # Panics
///
/// Panics on a duplicate system name, on a constraint naming a system that
/// was never added, and on a constraint cycle.
pub(crate) fn sort(nodes: &[Node], sets: &HashMap<SetId, SetConfig>) -> Vec<usize> {
    let mut by_name: HashMap<&'static str, usize> = HashMap::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        if by_name.insert(node.name, index).is_some() {
            log::error!("duplicate system name `{}` in phase", node.name);
            panic!("duplicate system name `{}` in phase", node.name);
        }
    }

    let mut members: HashMap<SetId, Vec<usize>> = HashMap::new();
    for (index, node) in nodes.iter().enumerate() {
        for &set in &node.sets {
            members.entry(set).or_default().push(index);
        }
    }

    // An anchor resolves to the systems on its far side. A set with no
    // members resolves to nothing, which constrains nothing.
    let resolve = |anchor: &Anchor| -> Vec<usize> {
        match anchor {
            Anchor::System(name) => match by_name.get(name) {
                Some(&index) => vec![index],
                None => {
                    log::error!("ordering constraint references unknown system `{name}`");
                    panic!("ordering constraint references unknown system `{name}`");
                }
            },
            Anchor::Set(set) => members.get(set).cloned().unwrap_or_default(),
        }
    };

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree: Vec<usize> = vec![0; nodes.len()];
    let mut add_edge = |edges: &mut Vec<Vec<usize>>, in_degree: &mut Vec<usize>, from: usize, to: usize| {
        if from == to {
            return;
        }
        edges[from].push(to);
        in_degree[to] += 1;
    };

    for (index, node) in nodes.iter().enumerate() {
        for anchor in &node.before {
            for target in resolve(anchor) {
                add_edge(&mut edges, &mut in_degree, index, target);
            }
        }
        for anchor in &node.after {
            for target in resolve(anchor) {
                add_edge(&mut edges, &mut in_degree, target, index);
            }
        }
    }

    // Set-level constraints expand onto every member.
    for config in sets.values() {
        let Some(set_members) = members.get(&config.set) else {
            continue;
        };
        for anchor in &config.before {
            for target in resolve(anchor) {
                for &member in set_members {
                    add_edge(&mut edges, &mut in_degree, member, target);
                }
            }
        }
        for anchor in &config.after {
            for target in resolve(anchor) {
                for &member in set_members {
                    add_edge(&mut edges, &mut in_degree, target, member);
                }
            }
        }
    }

    // Kahn's algorithm, seeded in insertion order.
    let mut ready: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(index) = ready.pop_front() {
        order.push(index);
        for &target in &edges[index] {
            in_degree[target] -= 1;
            if in_degree[target] == 0 {
                ready.push_back(target);
            }
        }
    }

    if order.len() < nodes.len() {
        let stuck: Vec<&str> = (0..nodes.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| nodes[i].name)
            .collect();
        log::error!("cycle in system ordering constraints involving {stuck:?}");
        panic!("cycle in system ordering constraints involving {stuck:?}");
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{system::Access, world};

    crate::define_set!(First, Second);

    fn node(name: &'static str) -> Node {
        Node {
            name,
            system: System::exclusive(|_world| {}),
            before: Vec::new(),
            after: Vec::new(),
            sets: Vec::new(),
        }
    }

    fn config_node(config: SystemConfig, world: &mut world::World) -> Node {
        Node {
            name: config.name,
            system: (config.build)(world),
            before: config.before,
            after: config.after,
            sets: config.sets,
        }
    }

    #[test]
    fn unconstrained_systems_keep_insertion_order() {
        // Given
        let nodes = vec![node("a"), node("b"), node("c")];

        // When
        let order = sort(&nodes, &HashMap::new());

        // Then
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn after_constraint_reorders() {
        // Given - "a" must run after "c"
        let mut world = world::World::new(world::Id::new(0));
        fn noop() {}
        let nodes = vec![
            config_node(noop.named("a").after("c"), &mut world),
            config_node(noop.named("b"), &mut world),
            config_node(noop.named("c"), &mut world),
        ];

        // When
        let order = sort(&nodes, &HashMap::new());

        // Then
        let position = |name: &str| order.iter().position(|&i| nodes[i].name == name).unwrap();
        assert!(position("c") < position("a"));
    }

    #[test]
    fn set_constraints_expand_to_members() {
        // Given - everything in Second runs after everything in First
        let mut world = world::World::new(world::Id::new(0));
        fn noop() {}
        let nodes = vec![
            config_node(noop.named("late").in_set(Second), &mut world),
            config_node(noop.named("early_a").in_set(First), &mut world),
            config_node(noop.named("early_b").in_set(First), &mut world),
        ];
        let mut sets = HashMap::new();
        sets.insert(Second.id(), Second.after_set(First));

        // When
        let order = sort(&nodes, &sets);

        // Then
        assert_eq!(order.last(), Some(&0));
    }

    #[test]
    #[should_panic(expected = "unknown system")]
    fn unknown_anchor_is_fatal() {
        let mut world = world::World::new(world::Id::new(0));
        fn noop() {}
        let nodes = vec![config_node(noop.named("a").after("missing"), &mut world)];
        sort(&nodes, &HashMap::new());
    }

    #[test]
    #[should_panic(expected = "duplicate system name")]
    fn duplicate_name_is_fatal() {
        let nodes = vec![node("same"), node("same")];
        sort(&nodes, &HashMap::new());
    }

    #[test]
    #[should_panic(expected = "cycle in system ordering")]
    fn constraint_cycle_is_fatal() {
        let mut world = world::World::new(world::Id::new(0));
        fn noop() {}
        let nodes = vec![
            config_node(noop.named("a").after("b"), &mut world),
            config_node(noop.named("b").after("a"), &mut world),
        ];
        sort(&nodes, &HashMap::new());
    }

    #[test]
    fn default_name_is_the_type_name() {
        // Given
        fn noop() {}

        // When
        let config = noop.into_config();

        // Then
        assert!(config.name.contains("noop"));
    }

    #[test]
    fn built_systems_carry_their_access() {
        // Given
        let mut world = world::World::new(world::Id::new(0));
        fn exclusive(_world: &mut crate::world::World) {}

        // When
        let node = config_node(exclusive.named("exclusive"), &mut world);

        // Then
        assert!(node.system.access().is_world());
        assert!(Access::world().conflicts_with(node.system.access()));
    }
}
