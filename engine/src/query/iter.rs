//! The query result iterator.

use std::marker::PhantomData;

use crate::{
    query::data::Data,
    storage::{Archetype, Archetypes, archetype},
};

/// Iterates every entity matched by a query, one archetype at a time.
///
/// The total count is precomputed at construction, so the iterator is exact
/// sized. Structural mutation is impossible while it lives; it holds the
/// world's archetypes mutably.
pub struct Iter<'w, D: Data> {
    archetypes: &'w mut Archetypes,

    /// Non-empty matching archetypes.
    ids: Vec<archetype::Id>,

    archetype_index: usize,
    row: usize,

    /// Items yielded so far.
    index: usize,

    /// Total items this iterator will yield.
    len: usize,

    _marker: PhantomData<D>,
}

impl<'w, D: Data> Iter<'w, D> {
    pub(crate) fn new(archetypes: &'w mut Archetypes, matching: Vec<archetype::Id>) -> Self {
        let ids: Vec<_> = matching
            .into_iter()
            .filter(|id| !archetypes.get(*id).is_empty())
            .collect();
        let len = ids.iter().map(|id| archetypes.get(*id).len()).sum();
        Self {
            archetypes,
            ids,
            archetype_index: 0,
            row: 0,
            index: 0,
            len,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<'w, D: Data> Iterator for Iter<'w, D> {
    type Item = D::Data<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }

        let archetype = self.archetypes.get_mut(self.ids[self.archetype_index]) as *mut Archetype;
        let row = self.row;
        // SAFETY: the raw re-borrow decouples the yielded item's lifetime from
        // this &mut self borrow. Each item reads a distinct row, and the data
        // tuple was validated to name each component column at most once.
        let (entity, archetype) = unsafe { ((*archetype).entity(row), &mut *archetype) };

        self.row += 1;
        if self.row >= archetype.len() {
            self.archetype_index += 1;
            self.row = 0;
        }
        self.index += 1;

        unsafe { D::fetch(entity, archetype, row) }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl<'w, D: Data> ExactSizeIterator for Iter<'w, D> {}
