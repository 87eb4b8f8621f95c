//! Query data tuples.
//!
//! [`Data`] is implemented by anything that can form a query's yield: a single
//! [`Selector`], tuples of `Data` (nesting allowed), and `()`. The flattened
//! [`DataSpec`] drives archetype matching, duplicate validation, and system
//! access declarations.

use std::collections::HashSet;

use fixedbitset::FixedBitSet;

use crate::{
    component::Spec,
    entity::Entity,
    query::selector::{Selector, SelectorSpec},
    registry::TypeRegistry,
    storage::Archetype,
};

/// A complete query yield description.
pub trait Data: Sized {
    type Data<'w>;

    /// The flattened selector list for this data tuple.
    fn spec(registry: &TypeRegistry) -> DataSpec;

    /// Fetch this tuple's values for one archetype row.
    ///
    /// # Safety
    ///
    /// Caller must guarantee no conflicting borrow of the same columns exists,
    /// and that the data tuple names each component at most once.
    unsafe fn fetch<'w>(
        entity: Entity,
        archetype: &'w mut Archetype,
        row: usize,
    ) -> Option<Self::Data<'w>>;
}

/// The flattened selector list of a [`Data`] tuple.
#[derive(Debug, Default, Clone)]
pub struct DataSpec {
    selectors: Vec<SelectorSpec>,
}

impl DataSpec {
    pub const EMPTY: DataSpec = Self::new(vec![]);

    #[inline]
    pub const fn new(selectors: Vec<SelectorSpec>) -> Self {
        Self { selectors }
    }

    #[inline]
    pub fn selectors(&self) -> &[SelectorSpec] {
        &self.selectors
    }

    /// The component set an archetype must carry to match. Optional selectors
    /// do not restrict matching.
    pub fn required_spec(&self) -> Spec {
        self.selectors
            .iter()
            .filter_map(|selector| match selector {
                SelectorSpec::Component {
                    id,
                    optional: false,
                    ..
                } => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// The required component set as a bitset sized for `registry`.
    pub fn required_mask(&self, registry: &TypeRegistry) -> FixedBitSet {
        let mut mask = FixedBitSet::with_capacity(registry.len());
        for id in self.required_spec().ids() {
            mask.insert(id.index());
        }
        mask
    }

    /// Whether any selector takes a mutable borrow.
    pub fn is_mutable(&self) -> bool {
        self.selectors.iter().any(|selector| {
            matches!(selector, SelectorSpec::Component { mutable: true, .. })
        })
    }

    /// Whether no component appears twice. Duplicates would alias one column
    /// within a single yielded tuple.
    pub fn is_valid(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.selectors.len());
        for selector in &self.selectors {
            let SelectorSpec::Component { id, .. } = selector else {
                continue;
            };
            if !seen.insert(*id) {
                return false;
            }
        }
        true
    }
}

impl<S: Selector> Data for S {
    type Data<'w> = S::Value<'w>;

    fn spec(registry: &TypeRegistry) -> DataSpec {
        DataSpec::new(vec![S::spec(registry)])
    }

    unsafe fn fetch<'w>(
        entity: Entity,
        archetype: &'w mut Archetype,
        row: usize,
    ) -> Option<Self::Data<'w>> {
        unsafe { S::fetch(entity, archetype, row) }
    }
}

impl Data for () {
    type Data<'w> = ();

    fn spec(_registry: &TypeRegistry) -> DataSpec {
        DataSpec::EMPTY
    }

    // A unit yield fetches nothing but still counts the row.
    unsafe fn fetch<'w>(
        _entity: Entity,
        _archetype: &'w mut Archetype,
        _row: usize,
    ) -> Option<Self::Data<'w>> {
        Some(())
    }
}

macro_rules! data_tuple_impl {
    ($($name:ident),*) => {
        impl<$($name: Data),*> Data for ($($name,)*) {
            type Data<'w> = ($($name::Data<'w>,)*);

            fn spec(registry: &TypeRegistry) -> DataSpec {
                let mut selectors = Vec::new();
                $(selectors.extend(<$name>::spec(registry).selectors().iter().copied());)*
                DataSpec::new(selectors)
            }

            unsafe fn fetch<'w>(
                entity: Entity,
                archetype: &'w mut Archetype,
                row: usize,
            ) -> Option<Self::Data<'w>> {
                Some((
                    $(
                        // SAFETY: aliased archetype re-borrows are sound because
                        // validation rejects data tuples naming a component twice,
                        // so each selector touches a distinct column.
                        unsafe { <$name>::fetch(entity, &mut *(archetype as *mut Archetype), row)? },
                    )*
                ))
            }
        }
    };
}

crate::all_tuples!(data_tuple_impl);
