//! Struct binding: storing result columns into struct fields.
//!
//! A bindable struct describes its fields once through a static table
//! ([`Bindable::bind_fields`]) and exposes them by index through
//! [`BindTarget`]. Column names are resolved against that table into
//! [`FieldPath`]s, which are cached per `(type, column list)` and then
//! applied to every row without further name lookups.
//!
//! `#[derive(Bindable)]` generates both traits:
//!
//! ```ignore
//! use sqlmold::Bindable;
//!
//! #[derive(Debug, Default, Bindable)]
//! struct User {
//!     id: i64,
//!     #[bind("name")]
//!     username: String,
//!     #[bind("-")]
//!     cached: Option<String>,
//! }
//!
//! #[derive(Debug, Default, Bindable)]
//! struct Video {
//!     id: i64,
//!     #[bind("users,bind")]
//!     user: Option<User>,
//! }
//! ```

mod mapping;

#[cfg(test)]
mod tests;

pub use mapping::{
    FieldPath, bind_mapping, bind_row_into, bind_rows, compile_mapping, field_mut, field_ref,
    scan_row, values_from_mapping,
};

use crate::eager::Relationships;
use crate::value::{FromValue, ToValue, Value};

/// How a field participates in binding.
#[derive(Clone, Copy)]
pub enum FieldKind {
    /// Receives one column value.
    Scalar,
    /// A nested bindable struct whose own fields are matched under this
    /// field's name (or directly, when the name is empty).
    Nested(fn() -> &'static [BindField]),
}

impl std::fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldKind::Scalar => f.write_str("Scalar"),
            FieldKind::Nested(_) => f.write_str("Nested"),
        }
    }
}

/// One entry of a struct's field table.
#[derive(Debug, Clone, Copy)]
pub struct BindField {
    /// Column name or path segment.
    pub name: &'static str,
    pub kind: FieldKind,
}

impl BindField {
    pub const fn scalar(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar,
        }
    }

    pub const fn nested(name: &'static str, fields: fn() -> &'static [BindField]) -> Self {
        Self {
            name,
            kind: FieldKind::Nested(fields),
        }
    }
}

/// A single field that can take and produce a [`Value`].
pub trait Scan {
    fn set_value(&mut self, value: Value) -> Result<(), String>;
    fn get_value(&self) -> Value;
}

impl<T: FromValue + ToValue> Scan for T {
    fn set_value(&mut self, value: Value) -> Result<(), String> {
        *self = T::from_value(value)?;
        Ok(())
    }

    fn get_value(&self) -> Value {
        self.to_value()
    }
}

/// Mutable access to one field.
pub enum FieldMut<'a> {
    Scalar(&'a mut dyn Scan),
    Nested(&'a mut dyn BindTarget),
}

/// Shared access to one field.
pub enum FieldRef<'a> {
    Scalar(&'a dyn Scan),
    Nested(&'a dyn BindTarget),
}

/// Index-addressed field access.
///
/// Indices are positions in the owning type's [`Bindable::bind_fields`] table.
pub trait BindTarget: Send {
    fn field_mut(&mut self, idx: usize) -> Option<FieldMut<'_>>;

    /// `None` for an unknown index, or an unallocated nested target.
    fn field_ref(&self, idx: usize) -> Option<FieldRef<'_>>;
}

/// A struct that result rows can be bound into.
pub trait Bindable: BindTarget + Default + Send + Sync + 'static {
    /// The static field table, in field index order.
    fn bind_fields() -> &'static [BindField];

    /// Relationship loaders for eager loading, if the type has any.
    fn relationships() -> Option<&'static Relationships<Self>> {
        None
    }
}

/// Types usable as a nested (`bind`-tagged) field.
///
/// `#[derive(Bindable)]` implements it for the struct itself; `Option<T>` and
/// `Box<T>` of a bindable struct are covered here.
pub trait NestedBind {
    fn nested_fields() -> &'static [BindField];
}

impl<T: Bindable> NestedBind for Option<T> {
    fn nested_fields() -> &'static [BindField] {
        T::bind_fields()
    }
}

impl<T: Bindable> NestedBind for Box<T> {
    fn nested_fields() -> &'static [BindField] {
        T::bind_fields()
    }
}

impl<T: Bindable> BindTarget for Option<T> {
    fn field_mut(&mut self, idx: usize) -> Option<FieldMut<'_>> {
        self.get_or_insert_with(T::default).field_mut(idx)
    }

    fn field_ref(&self, idx: usize) -> Option<FieldRef<'_>> {
        self.as_ref()?.field_ref(idx)
    }
}

impl<T: Bindable> BindTarget for Box<T> {
    fn field_mut(&mut self, idx: usize) -> Option<FieldMut<'_>> {
        (**self).field_mut(idx)
    }

    fn field_ref(&self, idx: usize) -> Option<FieldRef<'_>> {
        (**self).field_ref(idx)
    }
}
