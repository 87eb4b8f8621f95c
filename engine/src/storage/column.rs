//! Per-component value columns.
//!
//! A [`Column`] holds every value of one component type within one archetype,
//! row-aligned with the archetype's entity list. Values are stored as erased
//! [`Val`]s; the column's [`TypeInfo`] supplies default-construction and
//! duplication for rows in flight during migration.

use crate::{
    registry::{TypeId, TypeInfo},
    value::Val,
};

pub struct Column {
    info: TypeInfo,
    values: Vec<Val>,
}

impl Column {
    pub fn new(info: TypeInfo) -> Self {
        Self {
            info,
            values: Vec::new(),
        }
    }

    /// The component type this column stores.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.info.id()
    }

    /// The `std::any::TypeId` of the stored component.
    #[inline]
    pub fn std_id(&self) -> std::any::TypeId {
        self.info.std_id()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append a default-constructed value, returning its row.
    pub fn push_default(&mut self) -> usize {
        self.values.push(self.info.construct());
        self.values.len() - 1
    }

    /// Append `value`, returning its row.
    ///
    /// # Panics
    ///
    /// Panics if `value` holds a different type.
    pub fn push(&mut self, value: Val) -> usize {
        assert!(
            value.type_id() == self.info.std_id(),
            "column {} given value of type {}",
            self.info.name(),
            value.type_name()
        );
        self.values.push(value);
        self.values.len() - 1
    }

    /// Overwrite the value at `row`. The old value is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds or `value` holds a different type.
    pub fn set(&mut self, row: usize, value: Val) {
        assert!(
            value.type_id() == self.info.std_id(),
            "column {} given value of type {}",
            self.info.name(),
            value.type_name()
        );
        self.values[row] = value;
    }

    /// Clone the value at `row`.
    pub fn duplicate(&self, row: usize) -> Val {
        self.info.duplicate(&self.values[row])
    }

    /// Remove the value at `row`, moving the last value into its place.
    pub fn swap_remove(&mut self, row: usize) -> Val {
        self.values.swap_remove(row)
    }

    /// Borrow the value at `row` as `C`.
    #[inline]
    pub fn get<C: 'static>(&self, row: usize) -> Option<&C> {
        self.values[row].get::<C>()
    }

    /// Mutably borrow the value at `row` as `C`.
    #[inline]
    pub fn get_mut<C: 'static>(&mut self, row: usize) -> Option<&mut C> {
        self.values[row].get_mut::<C>()
    }
}

impl std::fmt::Debug for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("type", &self.info.name())
            .field("len", &self.values.len())
            .finish()
    }
}
