//! Entity handles and allocation.
//!
//! An [`Entity`] is a lightweight handle pairing an [`Id`] slot with a
//! [`Generation`]. Slots are recycled through a dead pool after despawn, and the
//! generation for a slot is bumped on every free, so a stale handle can always be
//! told apart from the live entity currently occupying the same slot.
//!
//! The [`Allocator`] works through `&self`: ids come from an atomic counter or
//! the lock-free dead pool, and generations live in chunked atomic arrays. This
//! lets deferred commands reserve entity ids without exclusive world access.

use std::sync::{
    RwLock,
    atomic::{AtomicU32, Ordering},
};

use crossbeam::queue::SegQueue;

/// How many times an id slot has been recycled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u32);

impl Generation {
    const FIRST: Self = Self(0);

    /// The generation after this one.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// An entity slot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl From<u32> for Id {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A handle to an entity.
///
/// Two handles with the same id but different generations refer to different
/// entities; at most one of them is live in a world at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    id: Id,
    generation: Generation,
}

impl Entity {
    /// A handle with the given id and the first generation. Test helper.
    #[inline]
    pub(crate) fn new(id: impl Into<Id>) -> Self {
        Self::with_generation(id.into(), Generation::FIRST)
    }

    #[inline]
    pub(crate) const fn with_generation(id: Id, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// The slot id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The recycle generation.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Index of this entity in slot-indexed storage.
    #[inline]
    pub fn index(&self) -> usize {
        self.id.0 as usize
    }
}

impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id
            .cmp(&other.id)
            .then(self.generation.cmp(&other.generation))
    }
}

const CHUNK_SIZE: usize = 1024;

/// Growable map from id slot to its current generation, chunked so existing
/// counters never move when the map grows.
#[derive(Default)]
struct Generations {
    chunks: RwLock<Vec<Box<[AtomicU32; CHUNK_SIZE]>>>,
}

impl Generations {
    fn get(&self, id: Id) -> Generation {
        let chunk = id.0 as usize / CHUNK_SIZE;
        let slot = id.0 as usize % CHUNK_SIZE;
        let chunks = self.chunks.read().expect("generation map poisoned");
        Generation(match chunks.get(chunk) {
            Some(chunk) => chunk[slot].load(Ordering::Acquire),
            None => 0,
        })
    }

    fn increment(&self, id: Id) {
        self.ensure_capacity(id);
        let chunk = id.0 as usize / CHUNK_SIZE;
        let slot = id.0 as usize % CHUNK_SIZE;
        let chunks = self.chunks.read().expect("generation map poisoned");
        chunks[chunk][slot].fetch_add(1, Ordering::Release);
    }

    fn ensure_capacity(&self, id: Id) {
        let chunk = id.0 as usize / CHUNK_SIZE;
        if chunk < self.chunks.read().expect("generation map poisoned").len() {
            return;
        }
        let mut chunks = self.chunks.write().expect("generation map poisoned");
        while chunks.len() <= chunk {
            chunks.push(Box::new(std::array::from_fn(|_| AtomicU32::new(0))));
        }
    }
}

/// Allocates and recycles entity handles.
///
/// Freed ids go into a dead pool and are reused before fresh ids are minted,
/// keeping the slot space compact for slot-indexed storage. Every operation
/// takes `&self`, so handles can be reserved from deferred contexts.
#[derive(Default)]
pub struct Allocator {
    generations: Generations,
    dead_pool: SegQueue<Id>,
    next_id: AtomicU32,
}

impl Allocator {
    /// Allocate one entity, preferring a recycled slot.
    pub fn alloc(&self) -> Entity {
        if let Some(id) = self.dead_pool.pop() {
            return Entity::with_generation(id, self.generations.get(id));
        }
        let id = Id(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.generations.ensure_capacity(id);
        Entity::new(id)
    }

    /// Allocate `count` entities at once, draining the dead pool first.
    pub fn alloc_many(&self, count: usize) -> Vec<Entity> {
        let mut alloced = Vec::with_capacity(count);
        while alloced.len() < count
            && let Some(id) = self.dead_pool.pop()
        {
            alloced.push(Entity::with_generation(id, self.generations.get(id)));
        }

        let remaining = (count - alloced.len()) as u32;
        if remaining > 0 {
            let start = self.next_id.fetch_add(remaining, Ordering::Relaxed);
            let end = start + remaining;
            self.generations.ensure_capacity(Id(end - 1));
            alloced.extend((start..end).map(|id| Entity::new(Id(id))));
        }
        alloced
    }

    /// Return an entity's slot to the pool, bumping its generation so stale
    /// handles stop validating.
    pub fn free(&self, entity: Entity) {
        self.generations.increment(entity.id());
        self.dead_pool.push(entity.id());
    }

    /// Whether `entity` is the current occupant of its slot.
    pub fn is_live(&self, entity: Entity) -> bool {
        self.generations.get(entity.id()) == entity.generation()
    }
}

#[test]
fn alloc_yields_unique_handles() {
    // Given
    let allocator = Allocator::default();

    // When
    let mut entities: Vec<_> = (0..200).map(|_| allocator.alloc()).collect();

    // Then
    let before = entities.len();
    entities.sort();
    entities.dedup();
    assert_eq!(before, entities.len());
}

#[test]
fn freed_slots_are_recycled_with_bumped_generation() {
    // Given
    let allocator = Allocator::default();
    let first = allocator.alloc();

    // When
    allocator.free(first);
    let reused = allocator.alloc();

    // Then
    assert_eq!(reused.id(), first.id());
    assert_eq!(reused.generation(), first.generation().next());
}

#[test]
fn alloc_many_mixes_pool_and_fresh_ids() {
    // Given
    let allocator = Allocator::default();
    for entity in allocator.alloc_many(3) {
        allocator.free(entity);
    }

    // When
    let entities = allocator.alloc_many(5);

    // Then - 3 recycled, 2 fresh
    assert_eq!(entities.len(), 5);
    let recycled = entities
        .iter()
        .filter(|e| e.generation() == Generation(1))
        .count();
    assert_eq!(recycled, 3);
    let mut fresh: Vec<_> = entities
        .iter()
        .filter(|e| e.generation() == Generation(0))
        .map(|e| e.id())
        .collect();
    fresh.sort();
    assert_eq!(fresh, vec![Id(3), Id(4)]);
}

#[test]
fn stale_handles_fail_liveness() {
    // Given
    let allocator = Allocator::default();
    let entity = allocator.alloc();
    assert!(allocator.is_live(entity));

    // When
    allocator.free(entity);
    let reused = allocator.alloc();

    // Then
    assert!(!allocator.is_live(entity));
    assert!(allocator.is_live(reused));
}

#[test]
fn generations_survive_chunk_growth() {
    // Given
    let allocator = Allocator::default();
    let entity = allocator.alloc();
    allocator.free(entity);

    // When - force growth past the first chunk
    allocator.alloc_many(CHUNK_SIZE + 10);

    // Then
    assert_eq!(allocator.generations.get(entity.id()), Generation(1));
}

#[test]
fn entity_ordering_is_id_then_generation() {
    // Given
    let e1 = Entity::new(Id(1));
    let e2 = Entity::new(Id(2));
    let e1_next = Entity::with_generation(Id(1), Generation(1));

    // Then
    assert!(e1 < e2);
    assert!(e1 < e1_next);
    assert!(e1_next < e2);
}
