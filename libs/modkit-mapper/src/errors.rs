//! Error types of the mapping engine.
//!
//! Only two operations can fail: profile registration (configuration errors) and
//! capability narrowing. Mapping itself is total.

use thiserror::Error;

use crate::value::FieldType;

/// Configuration error raised by `Mapper::register_profile`.
///
/// A failed registration never modifies the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("selector `{selector}` is not a direct property access")]
    NotDirectMember { selector: String },

    #[error("selector `{selector}` reads a nested member; only direct properties can carry a profile")]
    NestedMember { selector: String },

    #[error("shape `{shape}` has no field `{field}`")]
    UnknownField { shape: &'static str, field: String },

    #[error("field `{shape}.{field}` is not readable")]
    NotReadable { shape: &'static str, field: String },

    #[error("transform for `{field}` takes {transform_input}, but the field is declared as {declared}")]
    SourceTypeMismatch {
        field: String,
        declared: FieldType,
        transform_input: FieldType,
    },

    #[error("transform body for `{field}` produces {}, expected {expected}", display_inferred(.inferred))]
    BodyTypeMismatch {
        field: String,
        expected: FieldType,
        inferred: Option<FieldType>,
    },

    #[error("transform body for `{field}` reads member `{member}`; bodies may only use their input")]
    BodyReadsMember { field: String, member: String },
}

fn display_inferred(inferred: &Option<FieldType>) -> String {
    inferred.map_or_else(|| "an ill-typed value".to_owned(), |t| t.to_string())
}

/// Capability-narrowing error raised by `ContractHandle::narrow_to`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("mapping contract `{contract}` does not implement `{requested}`")]
pub struct NarrowError {
    pub contract: &'static str,
    pub requested: &'static str,
}

impl NarrowError {
    #[must_use]
    pub fn new<C: ?Sized>(contract: &'static str) -> Self {
        Self {
            contract,
            requested: std::any::type_name::<C>(),
        }
    }
}

/// Umbrella error for the engine's fallible operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapperError {
    #[error(transparent)]
    Configuration(#[from] ProfileError),

    #[error(transparent)]
    Narrowing(#[from] NarrowError),
}

/// Error loading `MapperConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid mapper configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Invalid(Box::new(err))
    }
}
