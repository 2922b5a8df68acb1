//! Statically declared field tables for entity and destination shapes.
//!
//! A `Shape` replaces runtime reflection: each record type publishes its field
//! names, types and read/write capability once, usually via `#[derive(Shape)]`.

use crate::value::{FieldType, Value};

/// One entry of a shape's field table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub ty: FieldType,
    pub readable: bool,
    pub writable: bool,
}

impl FieldDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            readable: true,
            writable: true,
        }
    }

    #[must_use]
    pub const fn read_only(self) -> Self {
        Self {
            writable: false,
            ..self
        }
    }

    #[must_use]
    pub const fn write_only(self) -> Self {
        Self {
            readable: false,
            ..self
        }
    }
}

/// A record type the mapper can read from and construct.
///
/// # Example
///
/// ```rust,ignore
/// use modkit_mapper::Shape;
///
/// #[derive(Default, Shape)]
/// pub struct ProductSummary {
///     pub id: i64,
///     pub name: String,
/// }
/// ```
pub trait Shape: Default + Send + Sync + 'static {
    /// Shape name used in logs and errors.
    const NAME: &'static str;

    /// Field table in declaration order.
    fn fields() -> &'static [FieldDescriptor];

    /// Current value of a readable field, `None` for unknown or unreadable fields.
    fn read(&self, field: &str) -> Option<Value>;

    /// Store `value` into a writable field.
    ///
    /// Returns `false` (leaving the field untouched) when the field is unknown,
    /// not writable, or the value does not fit its declared type.
    fn write(&mut self, field: &str, value: Value) -> bool;

    fn field(name: &str) -> Option<&'static FieldDescriptor> {
        Self::fields().iter().find(|f| f.name == name)
    }
}
