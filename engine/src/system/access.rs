//! System access declarations.
//!
//! Every system declares, at registration time, which registered types it reads
//! and which it writes, as bitsets over registry ids. Two parameters of one
//! system must not conflict (write/write or read/write on the same type); the
//! scheduler relies on the declaration only for diagnostics today, since
//! execution is sequential.

use fixedbitset::FixedBitSet;

use crate::{
    query::{DataSpec, SelectorSpec},
    registry::{TypeId, TypeRegistry},
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Access {
    reads: FixedBitSet,
    writes: FixedBitSet,

    /// Exclusive access to the whole world.
    world: bool,
}

impl Access {
    /// An access touching nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Exclusive access to the entire world.
    pub fn world() -> Self {
        Self {
            world: true,
            ..Self::default()
        }
    }

    /// Access derived from a query's data tuple.
    pub fn from_data_spec(spec: &DataSpec, registry: &TypeRegistry) -> Self {
        let mut access = Self::none();
        for selector in spec.selectors() {
            if let SelectorSpec::Component { id, mutable, .. } = selector {
                if *mutable {
                    access.add_write(*id);
                } else {
                    access.add_read(*id);
                }
            }
        }
        access
    }

    pub fn add_read(&mut self, id: TypeId) {
        self.reads.grow(id.index() + 1);
        self.reads.insert(id.index());
    }

    pub fn add_write(&mut self, id: TypeId) {
        self.writes.grow(id.index() + 1);
        self.writes.insert(id.index());
    }

    /// Fold `other` into this access.
    pub fn merge(&mut self, other: &Access) {
        self.reads.union_with(&other.reads);
        self.writes.union_with(&other.writes);
        self.world |= other.world;
    }

    pub fn reads(&self, id: TypeId) -> bool {
        self.reads.contains(id.index())
    }

    pub fn writes(&self, id: TypeId) -> bool {
        self.writes.contains(id.index())
    }

    pub fn is_world(&self) -> bool {
        self.world
    }

    /// Whether this access and `other` could not run concurrently: any shared
    /// write, or either side claiming the whole world.
    pub fn conflicts_with(&self, other: &Access) -> bool {
        if self.world || other.world {
            return true;
        }
        !self.writes.is_disjoint(&other.writes)
            || !self.writes.is_disjoint(&other.reads)
            || !self.reads.is_disjoint(&other.writes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> TypeId {
        TypeId::new(raw)
    }

    #[test]
    fn reads_never_conflict_with_reads() {
        // Given
        let mut a = Access::none();
        a.add_read(id(1));
        let mut b = Access::none();
        b.add_read(id(1));

        // Then
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn writes_conflict_with_any_overlap() {
        // Given
        let mut writer = Access::none();
        writer.add_write(id(1));
        let mut reader = Access::none();
        reader.add_read(id(1));
        let mut other_writer = Access::none();
        other_writer.add_write(id(1));
        let mut unrelated = Access::none();
        unrelated.add_write(id(2));

        // Then
        assert!(writer.conflicts_with(&reader));
        assert!(writer.conflicts_with(&other_writer));
        assert!(!writer.conflicts_with(&unrelated));
    }

    #[test]
    fn world_access_conflicts_with_everything_else() {
        // Given
        let world = Access::world();
        let mut reader = Access::none();
        reader.add_read(id(1));

        // Then
        assert!(world.conflicts_with(&reader));
        assert!(world.conflicts_with(&Access::world()));
        assert!(!Access::none().conflicts_with(&Access::none()));
    }

    #[test]
    fn merge_unions_both_sides() {
        // Given
        let mut a = Access::none();
        a.add_read(id(1));
        let mut b = Access::none();
        b.add_write(id(2));

        // When
        a.merge(&b);

        // Then
        assert!(a.reads(id(1)));
        assert!(a.writes(id(2)));
    }
}
