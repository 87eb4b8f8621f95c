//! Component bundles.
//!
//! A [`Bundle`] is a statically-typed group of component values, typically a
//! tuple, that can be applied to a [`BundleTarget`] one erased value at a time.
//! [`BoxedBundle`] is the erased form used by deferred commands, where the
//! concrete bundle type cannot cross the command queue.

use crate::{
    component::{Component, IntoSpec, Spec},
    each_tuple,
    registry::{TypeId, TypeRegistry},
    value::Val,
};

/// Receives the individual values of a bundle.
pub trait BundleTarget {
    /// Accept one component value.
    fn put(&mut self, id: TypeId, value: Val);
}

/// A statically-typed group of component values.
pub trait Bundle: IntoSpec + Sized + 'static {
    /// Hand each value to `target`, registering unseen types as needed.
    fn apply<T: BundleTarget>(self, registry: &TypeRegistry, target: &mut T);
}

impl<C: Component> Bundle for C {
    fn apply<T: BundleTarget>(self, registry: &TypeRegistry, target: &mut T) {
        let id = registry.register_component::<C>();
        target.put(id, Val::new(self));
    }
}

impl Bundle for () {
    fn apply<T: BundleTarget>(self, _registry: &TypeRegistry, _target: &mut T) {}
}

macro_rules! bundle_tuple_impl {
    ($($b:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($b: Bundle),+> Bundle for ($($b,)+) {
            fn apply<T: BundleTarget>(self, registry: &TypeRegistry, target: &mut T) {
                let ($($b,)+) = self;
                $($b.apply(registry, target);)+
            }
        }
    };
}

each_tuple!(bundle_tuple_impl @ A, B, C, D, E, F, G, H, I, J, K, L);

/// A bundle with its types erased, safe to move through a command queue.
pub struct BoxedBundle {
    spec: Spec,
    pairs: Vec<(TypeId, Val)>,
}

impl BoxedBundle {
    /// Erase `bundle`, resolving its spec against `registry`.
    pub fn new<B: Bundle>(bundle: B, registry: &TypeRegistry) -> Self {
        struct Collector(Vec<(TypeId, Val)>);
        impl BundleTarget for Collector {
            fn put(&mut self, id: TypeId, value: Val) {
                self.0.push((id, value));
            }
        }

        let spec = B::into_spec(registry);
        let mut collector = Collector(Vec::with_capacity(spec.len()));
        bundle.apply(registry, &mut collector);
        Self {
            spec,
            pairs: collector.0,
        }
    }

    /// The component set this bundle covers.
    #[inline]
    pub fn spec(&self) -> &Spec {
        &self.spec
    }

    /// Consume the bundle, yielding its values.
    pub fn take(self) -> Vec<(TypeId, Val)> {
        self.pairs
    }
}

impl std::fmt::Debug for BoxedBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedBundle").field("spec", &self.spec).finish()
    }
}
