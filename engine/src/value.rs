//! Owning type-erased values.
//!
//! [`Val`] is the unit of storage for component columns and resources: a box that
//! owns exactly one value of some `'static` type and destroys it on drop or
//! replacement. Borrows out of a `Val` are plain `&T`/`&mut T` tied to the borrow
//! of its container, so there is no separate non-owning reference type to misuse.

use std::any::{Any, TypeId as StdTypeId, type_name};

/// A type-erased, owning value box.
///
/// Downcasts are checked: asking for the wrong type yields `None` rather than
/// corrupting anything. The stored type's name is retained for diagnostics.
pub struct Val {
    type_id: StdTypeId,
    name: &'static str,
    inner: Box<dyn Any + Send + Sync>,
}

impl Val {
    /// Box a value.
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            type_id: StdTypeId::of::<T>(),
            name: type_name::<T>(),
            inner: Box::new(value),
        }
    }

    /// The `std::any::TypeId` of the stored value.
    #[inline]
    pub fn type_id(&self) -> StdTypeId {
        self.type_id
    }

    /// The name of the stored type, for diagnostics only.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// Check whether the stored value is a `T`.
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == StdTypeId::of::<T>()
    }

    /// Borrow the stored value as a `T`, if it is one.
    #[inline]
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Mutably borrow the stored value as a `T`, if it is one.
    #[inline]
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.inner.downcast_mut::<T>()
    }

    /// Take the stored value out as a `T`, returning `self` unchanged on a
    /// type mismatch.
    pub fn take<T: 'static>(self) -> Result<T, Self> {
        if self.is::<T>() {
            // Checked just above, the downcast cannot fail.
            Ok(*self.inner.downcast::<T>().unwrap_or_else(|_| unreachable!()))
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Debug for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Val").field("type", &self.name).finish()
    }
}
