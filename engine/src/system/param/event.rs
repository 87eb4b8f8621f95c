//! Event system parameters.

use crate::{
    event::{Channel, Cursor, Event, channel::EventId},
    system::{CommandBuffer, access::Access, param::Parameter},
    world::World,
};

/// Reads events of type `E`.
///
/// Each reader owns its own cursor, stored in the system's state, so two
/// systems reading the same channel each see every event. Events are yielded
/// at most once per reader.
pub struct EventReader<'w, 's, E: Event> {
    channel: &'w Channel<E>,
    cursor: &'s mut Cursor<E>,
}

impl<'w, E: Event> EventReader<'w, '_, E> {
    /// Yield the next unseen event.
    pub fn next(&mut self) -> Option<&'w E> {
        self.cursor.next(self.channel)
    }

    /// Iterate every unseen event.
    pub fn read(&mut self) -> impl Iterator<Item = &'w E> {
        self.cursor.drain(self.channel)
    }
}

/// Sends events of type `E`.
pub struct EventWriter<'w, E: Event> {
    channel: &'w mut Channel<E>,
}

impl<E: Event> EventWriter<'_, E> {
    /// Send one event, returning its id.
    pub fn send(&mut self, event: E) -> EventId {
        self.channel.send(event)
    }

    /// Send a batch of events.
    pub fn send_batch(&mut self, events: impl IntoIterator<Item = E>) {
        for event in events {
            self.channel.send(event);
        }
    }
}

impl<E: Event> Parameter for EventReader<'_, '_, E> {
    type Value<'w, 's> = EventReader<'w, 's, E>;
    type State = Cursor<E>;

    fn build_state(world: &mut World) -> Self::State {
        world.register_event::<E>();
        Cursor::new(world.events::<E>().expect("channel registered above"))
    }

    fn access(world: &World) -> Access {
        let mut access = Access::none();
        access.add_read(world.types().register_event::<E>());
        access
    }

    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        state: &'s mut Self::State,
        _commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        EventReader {
            channel: world
                .events::<E>()
                .expect("event channel opened at system build"),
            cursor: state,
        }
    }
}

impl<E: Event> Parameter for EventWriter<'_, E> {
    type Value<'w, 's> = EventWriter<'w, E>;
    type State = ();

    fn build_state(world: &mut World) -> Self::State {
        world.register_event::<E>();
    }

    fn access(world: &World) -> Access {
        let mut access = Access::none();
        access.add_write(world.types().register_event::<E>());
        access
    }

    unsafe fn extract<'w, 's>(
        world: &'w mut World,
        _state: &'s mut Self::State,
        _commands: &'w CommandBuffer,
    ) -> Self::Value<'w, 's> {
        EventWriter {
            channel: world
                .events_mut::<E>()
                .expect("event channel opened at system build"),
        }
    }
}
