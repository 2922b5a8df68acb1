//! # modkit-mapper-macros
//!
//! Derive macro for `modkit_mapper::Shape`.
//!
//! `#[derive(Shape)]` publishes a struct's field table (names, declared types,
//! read/write capability) and generates field-by-name accessors, so the mapper
//! can resolve and execute projections without runtime reflection.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use proc_macro::TokenStream;
use proc_macro_error2::proc_macro_error;
use syn::{DeriveInput, parse_macro_input};

mod shape;

/// Derive macro implementing `modkit_mapper::Shape` for a struct with named fields.
///
/// Every field type must implement `modkit_mapper::ValueType` unless the field
/// is skipped.
///
/// Field attributes:
/// - `#[shape(skip)]`: not part of the table (relation collections, nested shapes)
/// - `#[shape(read_only)]` / `#[shape(write_only)]`
/// - `#[shape(rename = "...")]`: field name as seen by the mapper
///
/// Container attribute: `#[shape(name = "...")]`, the shape name used in logs.
///
/// # Example
///
/// ```ignore
/// use modkit_mapper::Shape;
///
/// #[derive(Default, Shape)]
/// pub struct ProductDto {
///     pub id: i64,
///     pub name: String,
///     #[shape(skip)]
///     pub categories: Vec<IdName>,
/// }
/// ```
#[proc_macro_derive(Shape, attributes(shape))]
#[proc_macro_error]
pub fn derive_shape(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    shape::expand_derive_shape(&input).into()
}
