//! Public models for the catalog module.
//!
//! Every model derives `Shape` so the mapper can fill it by convention. Relation
//! collections are skipped from the field table; aggregate mappers own them.

use modkit_mapper::Shape;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Reference to a related record, flattened to its id and display name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Shape)]
pub struct IdName {
    pub id: i64,
    pub name: String,
}

impl IdName {
    #[must_use]
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Full product representation with its categories and tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Shape)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub score: Decimal,
    #[shape(skip)]
    pub categories: Vec<IdName>,
    #[shape(skip)]
    pub tags: Vec<IdName>,
}

/// List row: identity and display name only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Shape)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
}

/// Ranking row; `score` is rounded to a whole number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Shape)]
pub struct ProductScore {
    pub id: i64,
    pub score: i64,
}

/// Price row for clients that cannot handle decimal strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Shape)]
pub struct ProductPriceView {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Shape)]
pub struct CategoryDto {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use modkit_mapper::{FieldType, Value};
    use serde_json::json;

    use super::*;

    #[test]
    fn relation_collections_are_not_part_of_the_table() {
        let names: Vec<&str> = ProductDto::fields().iter().map(|f| f.name).collect();

        assert_eq!(names, ["id", "name", "description", "price", "score"]);
        assert_eq!(
            ProductDto::field("description").map(|f| f.ty),
            Some(FieldType::STRING.nullable())
        );
    }

    #[test]
    fn dto_serializes_with_nested_relations() {
        let dto = ProductDto {
            id: 1,
            name: "Lamp".to_owned(),
            price: Decimal::new(1999, 2),
            categories: vec![IdName::new(10, "Lighting")],
            ..ProductDto::default()
        };

        let value = serde_json::to_value(&dto).unwrap();

        assert_eq!(value["categories"], json!([{ "id": 10, "name": "Lighting" }]));
        assert_eq!(value["tags"], json!([]));
        assert_eq!(dto.read("price"), Some(Value::Decimal(Decimal::new(1999, 2))));
    }
}
