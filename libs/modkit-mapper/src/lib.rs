#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `ModKit` entity/DTO mapping and query-projection engine.
//!
//! Destination shapes are filled by convention: a destination field receives the
//! same-named entity field when the types are assignable. Narrow exceptions are
//! registered as profiles, typed transforms whose bodies are spliced into the
//! projection tree. Because a projection is an analyzable `Expr` tree rather than
//! an opaque closure, the same projection can run in-process (compiled and
//! cached) or be pushed down to the database as a `SELECT` list.
//!
//! # Features
//! - `sea-orm` (default): `push_down` adapter producing `sea_orm::Select`
//!
//! # Example
//! ```rust,ignore
//! use modkit_mapper::prelude::*;
//! use rust_decimal::Decimal;
//!
//! #[derive(Default, Shape)]
//! struct Product { id: i64, name: String, score: Decimal }
//!
//! #[derive(Default, Shape)]
//! struct ProductScore { id: i64, score: i64 }
//!
//! let mut mapper = Mapper::<Product>::default();
//! mapper.register_profile(
//!     "score",
//!     Transform::new::<Decimal, i64>(Expr::param().round().to_i64()),
//! )?;
//! let view: ProductScore = mapper.project_now(&product);
//! ```

// lets `#[derive(Shape)]` output resolve `::modkit_mapper` inside this crate
extern crate self as modkit_mapper;

pub mod ast;
pub mod cache;
pub mod config;
pub mod contract;
pub mod errors;
pub mod mapper;
pub mod profile;
pub mod projection;
#[cfg(feature = "sea-orm")]
pub mod push_down;
pub mod shape;
pub mod value;

pub use ast::{Expr, Func, Path};
pub use cache::{CacheStats, CompiledProjection, ProjectionCache, ProjectionKey};
pub use config::{CacheConfig, MapperConfig, UnboundPolicy};
pub use contract::{
    ContractHandle, MappingContract, MappingContractExt, RelationAwareMapping,
    RelationAwareMappingExt,
};
pub use errors::{ConfigError, MapperError, NarrowError, ProfileError};
pub use mapper::{ConventionMapper, Mapper};
pub use profile::{ProfileKey, ProfileRegistry, Selector, Transform};
pub use projection::{Binding, BindingKind, Projection, Resolution, UnboundField, UnboundReason, resolve};
pub use shape::{FieldDescriptor, Shape};
pub use value::{FieldKind, FieldType, FromValue, IntoValue, Value, ValueType};

/// Derive macro for `Shape`.
pub use modkit_mapper_macros::Shape;

pub mod prelude {
    pub use crate::ast::Expr;
    pub use crate::contract::{
        ContractHandle, MappingContract, MappingContractExt, RelationAwareMapping,
        RelationAwareMappingExt,
    };
    pub use crate::mapper::Mapper;
    pub use crate::profile::Transform;
    pub use crate::Shape;
}
