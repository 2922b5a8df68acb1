//! Runtime values and the static type descriptors the mapper reasons about.
//!
//! - `Value`: a dynamically typed scalar (or list of scalars) moved between shapes
//! - `FieldKind` / `FieldType`: the declared type of a shape field
//! - `ValueType`, `IntoValue`, `FromValue`: the bridge between Rust types and `Value`

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A value read from, or written to, a shape field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Decimal(Decimal),
    String(String),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    List(Vec<Value>),
}

impl Value {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Scalar kind of this value, `None` for `Null` and lists.
    #[must_use]
    pub fn kind(&self) -> Option<FieldKind> {
        Some(match self {
            Value::Null | Value::List(_) => return None,
            Value::Bool(_) => FieldKind::Bool,
            Value::I32(_) => FieldKind::I32,
            Value::I64(_) => FieldKind::I64,
            Value::F64(_) => FieldKind::F64,
            Value::Decimal(_) => FieldKind::Decimal,
            Value::String(_) => FieldKind::String,
            Value::Uuid(_) => FieldKind::Uuid,
            Value::DateTime(_) => FieldKind::DateTimeUtc,
            Value::Date(_) => FieldKind::Date,
        })
    }

    /// Static type of a literal. Untyped for `Null` and for empty lists.
    #[must_use]
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::List(items) => items
                .iter()
                .find_map(Value::kind)
                .map(|kind| FieldType::of(kind).list()),
            other => other.kind().map(FieldType::of),
        }
    }

    /// Whether this value may be stored in a field declared as `ty`.
    #[must_use]
    pub fn fits(&self, ty: FieldType) -> bool {
        match self {
            Value::Null => ty.nullable,
            Value::List(items) => {
                ty.list
                    && items
                        .iter()
                        .all(|item| item.kind() == Some(ty.kind))
            }
            scalar => !ty.list && scalar.kind() == Some(ty.kind),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::I32(n) => write!(f, "{n}"),
            Value::I64(n) => write!(f, "{n}"),
            Value::F64(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Date(d) => write!(f, "{d}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Logical scalar kinds a shape field can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKind {
    Bool,
    I32,
    I64,
    F64,
    Decimal,
    String,
    Uuid,
    DateTimeUtc,
    Date,
}

impl FieldKind {
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            FieldKind::I32 | FieldKind::I64 | FieldKind::F64 | FieldKind::Decimal
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Bool => write!(f, "Bool"),
            FieldKind::I32 => write!(f, "I32"),
            FieldKind::I64 => write!(f, "I64"),
            FieldKind::F64 => write!(f, "F64"),
            FieldKind::Decimal => write!(f, "Decimal"),
            FieldKind::String => write!(f, "String"),
            FieldKind::Uuid => write!(f, "Uuid"),
            FieldKind::DateTimeUtc => write!(f, "DateTimeUtc"),
            FieldKind::Date => write!(f, "Date"),
        }
    }
}

/// Declared type of a shape field.
///
/// `list` marks a collection of `kind` scalars. `nullable` marks an optional field
/// (for lists: an optional collection). Profiles are keyed by the full `FieldType`,
/// so `I64` and `Option<I64>` destinations are distinct keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldType {
    pub kind: FieldKind,
    pub nullable: bool,
    pub list: bool,
}

impl FieldType {
    pub const BOOL: FieldType = FieldType::of(FieldKind::Bool);
    pub const I32: FieldType = FieldType::of(FieldKind::I32);
    pub const I64: FieldType = FieldType::of(FieldKind::I64);
    pub const F64: FieldType = FieldType::of(FieldKind::F64);
    pub const DECIMAL: FieldType = FieldType::of(FieldKind::Decimal);
    pub const STRING: FieldType = FieldType::of(FieldKind::String);
    pub const UUID: FieldType = FieldType::of(FieldKind::Uuid);
    pub const DATETIME: FieldType = FieldType::of(FieldKind::DateTimeUtc);
    pub const DATE: FieldType = FieldType::of(FieldKind::Date);

    #[must_use]
    pub const fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            nullable: false,
            list: false,
        }
    }

    #[must_use]
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    #[must_use]
    pub const fn required(self) -> Self {
        Self {
            nullable: false,
            ..self
        }
    }

    #[must_use]
    pub const fn list(self) -> Self {
        Self { list: true, ..self }
    }

    /// Direct-copy compatibility: same kind and list-ness, and a nullable source
    /// only flows into a nullable target.
    #[must_use]
    pub fn is_assignable_to(self, target: FieldType) -> bool {
        self.kind == target.kind && self.list == target.list && (target.nullable || !self.nullable)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.nullable, self.list) {
            (false, false) => write!(f, "{}", self.kind),
            (true, false) => write!(f, "Option<{}>", self.kind),
            (false, true) => write!(f, "List<{}>", self.kind),
            (true, true) => write!(f, "Option<List<{}>>", self.kind),
        }
    }
}

/// Conversion of a Rust field value into a `Value`.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Conversion of a `Value` back into a Rust field value.
///
/// Returns `None` when the value does not fit the type; callers keep the
/// previous field value in that case.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

/// Rust types usable as shape fields.
pub trait ValueType: IntoValue + FromValue {
    const FIELD_TYPE: FieldType;
}

macro_rules! scalar_value_type {
    ($ty:ty, $variant:ident, $kind:ident) => {
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl FromValue for $ty {
            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }

        impl ValueType for $ty {
            const FIELD_TYPE: FieldType = FieldType::of(FieldKind::$kind);
        }
    };
}

scalar_value_type!(bool, Bool, Bool);
scalar_value_type!(i32, I32, I32);
scalar_value_type!(i64, I64, I64);
scalar_value_type!(f64, F64, F64);
scalar_value_type!(Decimal, Decimal, Decimal);
scalar_value_type!(String, String, String);
scalar_value_type!(Uuid, Uuid, Uuid);
scalar_value_type!(DateTime<Utc>, DateTime, DateTimeUtc);
scalar_value_type!(NaiveDate, Date, Date);

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: ValueType> ValueType for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE.nullable();
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: ValueType> ValueType for Vec<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE.list();
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}
