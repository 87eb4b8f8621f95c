//! Type-erased channel registry.
//!
//! The [`Broker`] owns one [`Channel`] per registered event type and drives
//! their frame updates without knowing the payload types, through a small
//! erased trait.

use std::{
    any::{Any, TypeId as StdTypeId, type_name},
    collections::HashMap,
};

use crate::event::{Channel, Event};

trait ErasedChannel: Send + Sync {
    fn update(&mut self);
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Event> ErasedChannel for Channel<E> {
    fn update(&mut self) {
        Channel::update(self);
    }

    fn clear(&mut self) {
        Channel::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// All event channels of one world.
#[derive(Default)]
pub struct Broker {
    channels: HashMap<StdTypeId, Box<dyn ErasedChannel>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a channel for `E` exists. Idempotent.
    pub fn register<E: Event>(&mut self) {
        self.channels
            .entry(StdTypeId::of::<E>())
            .or_insert_with(|| {
                log::debug!("opening event channel for {}", type_name::<E>());
                Box::new(Channel::<E>::new())
            });
    }

    /// The channel for `E`, if registered.
    pub fn channel<E: Event>(&self) -> Option<&Channel<E>> {
        self.channels
            .get(&StdTypeId::of::<E>())
            .and_then(|channel| channel.as_any().downcast_ref())
    }

    /// The channel for `E`, mutably, if registered.
    pub fn channel_mut<E: Event>(&mut self) -> Option<&mut Channel<E>> {
        self.channels
            .get_mut(&StdTypeId::of::<E>())
            .and_then(|channel| channel.as_any_mut().downcast_mut())
    }

    /// Advance every channel one frame.
    pub fn update_all(&mut self) {
        for channel in self.channels.values_mut() {
            channel.update();
        }
    }

    /// Drop every retained event in every channel.
    pub fn clear_all(&mut self) {
        for channel in self.channels.values_mut() {
            channel.clear();
        }
    }
}
