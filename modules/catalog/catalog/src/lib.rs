//! Catalog Module Implementation
//!
//! External shapes live in `catalog-sdk` and are re-exported here. This crate
//! owns the product aggregate, its storage rows, and the mappers between them.

pub use catalog_sdk::{
    CategoryDto, IdName, ProductDto, ProductPriceView, ProductScore, ProductSummary,
};

pub mod config;
pub mod domain;
pub mod infra;
pub mod mappers;

pub use config::{CatalogConfig, ScoreRounding};
pub use mappers::CatalogMappers;
