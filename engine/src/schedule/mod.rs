//! Organizes systems into labeled phases and runs them in caller order.
//!
//! A [`Schedule`] maps phase labels to [`Phase`]s. Phases are identified by
//! zero-sized marker types from [`define_phase!`]; the schedule enforces no
//! ordering between phases, the caller runs them in whatever order the frame
//! needs (or bundles the order into a [`Sequence`]):
//!
//! ```rust,ignore
//! define_phase!(Update, Render);
//!
//! let mut schedule = Schedule::new();
//! schedule.add_system(Update, movement.named("movement"), &mut world);
//! schedule.add_system(Render, draw.named("draw"), &mut world);
//!
//! let frame = Sequence::new().then(Update).then(Render);
//! loop {
//!     schedule.run_sequence(&frame, &mut world);
//!     world.update_events();
//! }
//! ```
//!
//! Within a phase, systems run sequentially in an order satisfying their
//! `before`/`after`/set constraints; see the [`graph`] module.

mod graph;
mod phase;

use std::collections::HashMap;

pub use graph::{Anchor, IntoSystemConfig, SetConfig, SetId, SetLabel, SystemConfig};
pub use phase::{Id, Label, Phase, Sequence};

use crate::world::World;

/// A container mapping phase labels to phases.
#[derive(Default)]
pub struct Schedule {
    phases: HashMap<Id, Phase>,
}

impl Schedule {
    #[inline]
    pub fn new() -> Self {
        Self {
            phases: HashMap::new(),
        }
    }

    /// Adds a system to the given phase, creating the phase if needed.
    ///
    /// Accepts plain functions, closures, and configured systems alike:
    ///
    /// ```rust,ignore
    /// schedule.add_system(Update, movement, &mut world);
    /// schedule.add_system(Update, collide.named("collide").after("movement"), &mut world);
    /// ```
    pub fn add_system<L: Label, M>(
        &mut self,
        label: L,
        system: impl IntoSystemConfig<M>,
        world: &mut World,
    ) {
        self.get_or_create_phase(label)
            .add_system(system.into_config(), world);
    }

    /// Applies ordering constraints to a set within the given phase.
    pub fn configure_set<L: Label>(&mut self, label: L, config: SetConfig) {
        self.get_or_create_phase(label).configure_set(config);
    }

    /// Runs all systems in the given phase.
    ///
    /// Returns `false` if the phase was never created.
    pub fn run<L: Label>(&mut self, label: L, world: &mut World) -> bool {
        if let Some(phase) = self.phases.get_mut(&label.id()) {
            phase.run(world);
            true
        } else {
            false
        }
    }

    /// Runs a sequence of phases in order, skipping any that do not exist.
    ///
    /// Returns the number of phases that ran.
    pub fn run_sequence(&mut self, sequence: &Sequence, world: &mut World) -> usize {
        let mut count = 0;
        for id in sequence.phases() {
            if let Some(phase) = self.phases.get_mut(id) {
                phase.run(world);
                count += 1;
            }
        }
        count
    }

    #[inline]
    pub fn has_phase<L: Label>(&self, label: L) -> bool {
        self.phases.contains_key(&label.id())
    }

    #[inline]
    pub fn get_phase<L: Label>(&self, label: L) -> Option<&Phase> {
        self.phases.get(&label.id())
    }

    fn get_or_create_phase<L: Label>(&mut self, label: L) -> &mut Phase {
        self.phases.entry(label.id()).or_default()
    }

    #[inline]
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use ember_macros::{Component, Resource};

    use super::*;
    use crate::{
        define_phase, define_set,
        system::param::{Query, ResMut},
        world,
    };

    define_phase!(Update, FixedUpdate, Render);
    define_set!(Physics, Reporting);

    #[derive(Component, Clone, Default, Debug, PartialEq)]
    struct Item {
        value: i32,
    }

    #[derive(Resource, Debug, PartialEq)]
    struct Total(i32);

    #[test]
    fn new_schedule_is_empty() {
        let schedule = Schedule::new();
        assert_eq!(schedule.phase_count(), 0);
    }

    #[test]
    fn add_system_creates_phase() {
        let mut world = world::World::new(world::Id::new(0));
        let mut schedule = Schedule::new();

        fn noop() {}

        assert!(!schedule.has_phase(Update));
        schedule.add_system(Update, noop, &mut world);
        assert!(schedule.has_phase(Update));
        assert_eq!(schedule.phase_count(), 1);
        assert_eq!(schedule.get_phase(Update).unwrap().systems_len(), 1);
    }

    #[test]
    fn run_returns_false_for_missing_phase() {
        let mut world = world::World::new(world::Id::new(0));
        let mut schedule = Schedule::new();

        assert!(!schedule.run(Update, &mut world));
    }

    #[test]
    fn run_only_executes_the_named_phase() {
        // Given
        let mut world = world::World::new(world::Id::new(0));
        let mut schedule = Schedule::new();
        let update_runs = Arc::new(AtomicU32::new(0));
        let fixed_runs = Arc::new(AtomicU32::new(0));
        let update_clone = Arc::clone(&update_runs);
        let fixed_clone = Arc::clone(&fixed_runs);

        schedule.add_system(
            Update,
            move || {
                update_clone.fetch_add(1, Ordering::SeqCst);
            },
            &mut world,
        );
        schedule.add_system(
            FixedUpdate,
            move || {
                fixed_clone.fetch_add(1, Ordering::SeqCst);
            },
            &mut world,
        );

        // When
        assert!(schedule.run(Update, &mut world));

        // Then
        assert_eq!(update_runs.load(Ordering::SeqCst), 1);
        assert_eq!(fixed_runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn run_sequence_executes_in_order_and_skips_missing() {
        // Given
        let mut world = world::World::new(world::Id::new(0));
        let mut schedule = Schedule::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_update = Arc::clone(&log);
        let log_render = Arc::clone(&log);

        schedule.add_system(
            Update,
            move || log_update.lock().unwrap().push("update"),
            &mut world,
        );
        schedule.add_system(
            Render,
            move || log_render.lock().unwrap().push("render"),
            &mut world,
        );

        // When - FixedUpdate was never created
        let frame = Sequence::new().then(FixedUpdate).then(Update).then(Render);
        let count = schedule.run_sequence(&frame, &mut world);

        // Then
        assert_eq!(count, 2);
        assert_eq!(*log.lock().unwrap(), vec!["update", "render"]);
    }

    #[test]
    fn multi_phase_workflow_mutates_the_world() {
        // Given - FixedUpdate increments, Update sums into a resource
        let mut world = world::World::new(world::Id::new(0));
        let mut schedule = Schedule::new();

        fn increment(items: Query<&mut Item>) {
            for item in items {
                item.value += 5;
            }
        }
        fn sum(items: Query<&Item>, mut total: ResMut<Total>) {
            total.0 = items.map(|item| item.value).sum();
        }

        schedule.add_system(FixedUpdate, increment, &mut world);
        schedule.add_system(Update, sum, &mut world);

        world.spawn(Item { value: 0 });
        world.spawn(Item { value: 0 });
        world.spawn(Item { value: 0 });
        world.insert_resource(Total(0));

        // When - two fixed steps then one update
        schedule.run(FixedUpdate, &mut world);
        schedule.run(FixedUpdate, &mut world);
        schedule.run(Update, &mut world);

        // Then - three items at 10 each
        assert_eq!(world.resource::<Total>(), Some(&Total(30)));
    }

    #[test]
    fn set_ordering_applies_across_configs() {
        // Given - reporting runs after physics regardless of insertion order
        let mut world = world::World::new(world::Id::new(0));
        let mut schedule = Schedule::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_report = Arc::clone(&log);
        let log_step = Arc::clone(&log);

        schedule.add_system(
            Update,
            (move || log_report.lock().unwrap().push("report"))
                .named("report")
                .in_set(Reporting),
            &mut world,
        );
        schedule.add_system(
            Update,
            (move || log_step.lock().unwrap().push("step"))
                .named("step")
                .in_set(Physics),
            &mut world,
        );
        schedule.configure_set(Update, Reporting.after_set(Physics));

        // When
        schedule.run(Update, &mut world);

        // Then
        assert_eq!(*log.lock().unwrap(), vec!["step", "report"]);
    }

    #[test]
    fn sequences_are_reusable() {
        let mut world = world::World::new(world::Id::new(0));
        let mut schedule = Schedule::new();
        let runs = Arc::new(AtomicU32::new(0));
        let runs_clone = Arc::clone(&runs);

        schedule.add_system(
            Update,
            move || {
                runs_clone.fetch_add(1, Ordering::SeqCst);
            },
            &mut world,
        );

        let frame = Sequence::new().then(Update);
        schedule.run_sequence(&frame, &mut world);
        schedule.run_sequence(&frame, &mut world);
        schedule.run_sequence(&frame, &mut world);

        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
