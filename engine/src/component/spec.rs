//! Component set specifications.
//!
//! A [`Spec`] is a sorted, deduplicated set of [`TypeId`]s. It identifies an
//! archetype, names the component set in structural commands, and feeds query
//! matching. Because the id list is canonicalized, two specs describing the same
//! set always compare equal and hash identically.

use crate::{
    each_tuple,
    registry::{TypeId, TypeRegistry},
};

/// A canonical set of component type ids.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Spec {
    ids: Vec<TypeId>,
}

impl Spec {
    /// The empty set.
    pub const EMPTY: Spec = Spec { ids: Vec::new() };

    /// Build a spec from an arbitrary id list. Sorts and deduplicates.
    pub fn new(mut ids: Vec<TypeId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }

    /// The ids in ascending order.
    #[inline]
    pub fn ids(&self) -> &[TypeId] {
        &self.ids
    }

    /// Number of component types in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is a member.
    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    /// Whether every id in `other` is a member.
    pub fn contains_all(&self, other: &Spec) -> bool {
        other.ids.iter().all(|id| self.contains(*id))
    }

    /// Whether any id in `other` is a member.
    pub fn contains_any(&self, other: &Spec) -> bool {
        other.ids.iter().any(|id| self.contains(*id))
    }

    /// Position of `id` within the sorted set, which is also its column index
    /// inside an archetype with this spec.
    #[inline]
    pub fn position(&self, id: TypeId) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    /// The union of this set and `other`.
    pub fn with(&self, other: &Spec) -> Spec {
        let mut ids = self.ids.clone();
        ids.extend_from_slice(&other.ids);
        Spec::new(ids)
    }

    /// This set minus the members of `other`.
    pub fn without(&self, other: &Spec) -> Spec {
        let ids = self
            .ids
            .iter()
            .copied()
            .filter(|id| !other.contains(*id))
            .collect();
        Spec { ids }
    }

    /// The members this set shares with `other`.
    pub fn intersect(&self, other: &Spec) -> Spec {
        let ids = self
            .ids
            .iter()
            .copied()
            .filter(|id| other.contains(*id))
            .collect();
        Spec { ids }
    }
}

impl FromIterator<TypeId> for Spec {
    fn from_iter<I: IntoIterator<Item = TypeId>>(iter: I) -> Self {
        Spec::new(iter.into_iter().collect())
    }
}

/// Types that can name a component set against a registry.
///
/// Implemented for single components, tuples of components, and `()`.
pub trait IntoSpec {
    /// Resolve the set, registering any unseen component types.
    fn into_spec(registry: &TypeRegistry) -> Spec;
}

impl<C: crate::component::Component> IntoSpec for C {
    fn into_spec(registry: &TypeRegistry) -> Spec {
        Spec::new(vec![registry.register_component::<C>()])
    }
}

impl IntoSpec for () {
    fn into_spec(_registry: &TypeRegistry) -> Spec {
        Spec::EMPTY
    }
}

macro_rules! spec_tuple_impl {
    ($($c:ident),+) => {
        impl<$($c: IntoSpec),+> IntoSpec for ($($c,)+) {
            fn into_spec(registry: &TypeRegistry) -> Spec {
                let mut spec = Spec::EMPTY;
                $(spec = spec.with(&$c::into_spec(registry));)+
                spec
            }
        }
    };
}

each_tuple!(spec_tuple_impl @ A, B, C, D, E, F, G, H, I, J, K, L);
