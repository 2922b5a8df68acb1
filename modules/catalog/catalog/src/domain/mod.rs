pub mod model;

pub use model::{Category, Product, ProductCategory, ProductTag, Tag};
