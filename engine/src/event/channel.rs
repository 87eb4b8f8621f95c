//! Double-buffered event channels.

use std::marker::PhantomData;

use crate::event::Event;

/// Identifier of one sent event, dense and monotonically increasing per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(usize);

impl EventId {
    #[inline]
    pub(crate) const fn new(raw: usize) -> Self {
        Self(raw)
    }

    #[inline]
    fn index(&self) -> usize {
        self.0
    }

    #[inline]
    fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// One buffer generation: the events sent during one frame, plus the id of the
/// first of them.
#[derive(Debug)]
struct Buffer<E> {
    events: Vec<E>,
    start: EventId,
}

impl<E> Buffer<E> {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            start: EventId::new(0),
        }
    }

    fn end(&self) -> EventId {
        EventId::new(self.start.index() + self.events.len())
    }

    fn get(&self, id: EventId) -> Option<&E> {
        if id < self.start {
            return None;
        }
        self.events.get(id.index() - self.start.index())
    }
}

/// The event stream for one event type.
///
/// Two buffers are retained: `front` holds last frame's events, `back` receives
/// this frame's. [`update`](Channel::update) swaps them and drops the oldest
/// generation.
#[derive(Debug)]
pub struct Channel<E: Event> {
    front: Buffer<E>,
    back: Buffer<E>,

    /// Total events ever sent; the id of the next send.
    count: usize,
}

impl<E: Event> Default for Channel<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Channel<E> {
    pub fn new() -> Self {
        Self {
            front: Buffer::new(),
            back: Buffer::new(),
            count: 0,
        }
    }

    /// Push an event, returning its id.
    pub fn send(&mut self, event: E) -> EventId {
        let id = EventId::new(self.count);
        self.back.events.push(event);
        self.count += 1;
        log::trace!("sent {} event {:?}", std::any::type_name::<E>(), id);
        id
    }

    /// Advance one frame: last frame's events become the old generation, the
    /// generation before that is dropped.
    pub fn update(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
        self.back.events.clear();
        self.back.start = EventId::new(self.count);
    }

    /// Drop every retained event.
    pub fn clear(&mut self) {
        self.front.events.clear();
        self.front.start = EventId::new(self.count);
        self.back.events.clear();
        self.back.start = EventId::new(self.count);
    }

    /// Id of the oldest event still retained. Equals the next send id when the
    /// channel holds nothing.
    pub fn oldest_id(&self) -> EventId {
        self.front.start
    }

    /// Fetch a retained event by id. `None` once it has aged out.
    pub fn get(&self, id: EventId) -> Option<&E> {
        self.back.get(id).or_else(|| self.front.get(id))
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.front.events.len() + self.back.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate every retained event, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.front.events.iter().chain(self.back.events.iter())
    }
}

/// A reader's position in a channel.
///
/// Each cursor independently tracks the next unseen event id. If the channel
/// trims past that id, the cursor clamps forward to the oldest retained event.
#[derive(Debug)]
pub struct Cursor<E: Event> {
    next: EventId,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Event> Cursor<E> {
    /// A cursor positioned at the oldest event `channel` retains.
    pub fn new(channel: &Channel<E>) -> Self {
        Self {
            next: channel.oldest_id(),
            _marker: PhantomData,
        }
    }

    /// Yield the next unseen event, or `None` when caught up.
    pub fn next<'c>(&mut self, channel: &'c Channel<E>) -> Option<&'c E> {
        if self.next < channel.oldest_id() {
            self.next = channel.oldest_id();
        }
        let event = channel.get(self.next)?;
        self.next = self.next.next();
        Some(event)
    }

    /// Drain every unseen event into an iterator.
    pub fn drain<'a, 'c>(
        &'a mut self,
        channel: &'c Channel<E>,
    ) -> impl Iterator<Item = &'c E> + use<'a, 'c, E> {
        std::iter::from_fn(move || self.next(channel))
    }
}

#[cfg(test)]
mod tests {
    use ember_macros::Event;

    use super::*;

    #[derive(Event, Debug, PartialEq)]
    struct Ping(u32);

    #[test]
    fn events_survive_exactly_two_updates() {
        // Given
        let mut channel = Channel::new();
        let id = channel.send(Ping(1));

        // When - first update ages the event into the old generation
        channel.update();

        // Then
        assert_eq!(channel.get(id), Some(&Ping(1)));

        // When - second update drops it
        channel.update();

        // Then
        assert_eq!(channel.get(id), None);
        assert!(channel.is_empty());
    }

    #[test]
    fn cursor_sees_each_event_once() {
        // Given
        let mut channel = Channel::new();
        let mut cursor = Cursor::new(&channel);
        channel.send(Ping(1));
        channel.send(Ping(2));

        // When / Then
        assert_eq!(cursor.next(&channel), Some(&Ping(1)));
        assert_eq!(cursor.next(&channel), Some(&Ping(2)));
        assert_eq!(cursor.next(&channel), None);

        // When - more events arrive
        channel.send(Ping(3));

        // Then - only the new one is yielded
        assert_eq!(cursor.next(&channel), Some(&Ping(3)));
        assert_eq!(cursor.next(&channel), None);
    }

    #[test]
    fn two_cursors_read_independently() {
        // Given
        let mut channel = Channel::new();
        let mut fast = Cursor::new(&channel);
        let mut slow = Cursor::new(&channel);
        channel.send(Ping(1));
        channel.send(Ping(2));

        // When - one reader drains, the other does not
        assert_eq!(fast.drain(&channel).count(), 2);

        // Then - the slow reader still sees everything
        assert_eq!(slow.next(&channel), Some(&Ping(1)));
        assert_eq!(slow.next(&channel), Some(&Ping(2)));
    }

    #[test]
    fn lagging_cursor_clamps_to_oldest_retained() {
        // Given
        let mut channel = Channel::new();
        let mut cursor = Cursor::new(&channel);
        channel.send(Ping(1));
        channel.update();
        channel.send(Ping(2));
        channel.update(); // Ping(1) dropped here
        channel.send(Ping(3));

        // When / Then - reader skips the trimmed event
        assert_eq!(cursor.next(&channel), Some(&Ping(2)));
        assert_eq!(cursor.next(&channel), Some(&Ping(3)));
        assert_eq!(cursor.next(&channel), None);
    }

    #[test]
    fn reader_polling_every_frame_misses_nothing() {
        // Given
        let mut channel = Channel::new();
        let mut cursor = Cursor::new(&channel);
        let mut seen = Vec::new();

        // When - send one event per frame for several frames
        for i in 0..5 {
            channel.send(Ping(i));
            seen.extend(cursor.drain(&channel).map(|p| p.0));
            channel.update();
        }

        // Then
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn clear_drops_everything_without_breaking_ids() {
        // Given
        let mut channel = Channel::new();
        channel.send(Ping(1));
        channel.update();
        channel.send(Ping(2));

        // When
        channel.clear();

        // Then
        assert!(channel.is_empty());
        let next = channel.send(Ping(3));
        assert_eq!(channel.get(next), Some(&Ping(3)));
    }
}
