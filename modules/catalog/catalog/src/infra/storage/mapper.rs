//! Storage row to domain entity conversions.

use crate::domain::{Category, Product, ProductCategory, ProductTag, Tag};

use super::entity::{category, product, product_category, product_tag, tag};

/// Convert product row to entity. Relations are loaded separately.
impl From<product::Model> for Product {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            score: model.score,
            categories: Vec::new(),
            tags: Vec::new(),
        }
    }
}

impl From<category::Model> for Category {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
        }
    }
}

impl From<tag::Model> for Tag {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// Convert a product row with its join rows, as returned by
/// `find_also_related`, into the aggregate.
#[must_use]
pub fn product_with_relations(
    model: product::Model,
    categories: Vec<(product_category::Model, Option<category::Model>)>,
    tags: Vec<(product_tag::Model, Option<tag::Model>)>,
) -> Product {
    Product {
        categories: categories
            .into_iter()
            .map(|(link, related)| ProductCategory {
                product_id: link.product_id,
                category_id: link.category_id,
                category: related.map(Category::from),
            })
            .collect(),
        tags: tags
            .into_iter()
            .map(|(link, related)| ProductTag {
                product_id: link.product_id,
                tag_id: link.tag_id,
                tag: related.map(Tag::from),
            })
            .collect(),
        ..Product::from(model)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[path = "mapper_test.rs"]
mod mapper_test;
