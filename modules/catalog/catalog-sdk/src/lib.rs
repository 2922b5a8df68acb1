//! Catalog SDK
//!
//! External shapes of the catalog module. They are the destination side of the
//! catalog mappers and carry no persistence concerns.

pub mod models;

pub use models::{
    CategoryDto, IdName, ProductDto, ProductPriceView, ProductScore, ProductSummary,
};
