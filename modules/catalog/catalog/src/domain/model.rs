//! Catalog entities.
//!
//! A `Product` owns its relation rows (`ProductCategory`, `ProductTag`). A
//! relation row always carries the related id; the related record itself is
//! only present when it was loaded alongside the product.

use modkit_mapper::Shape;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Default, PartialEq, Eq, Shape)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub score: Decimal,
    #[shape(skip)]
    pub categories: Vec<ProductCategory>,
    #[shape(skip)]
    pub tags: Vec<ProductTag>,
}

/// Join row between a product and a category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCategory {
    pub product_id: i64,
    pub category_id: i64,
    pub category: Option<Category>,
}

/// Join row between a product and a tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductTag {
    pub product_id: i64,
    pub tag_id: i64,
    pub tag: Option<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Shape)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Shape)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}
