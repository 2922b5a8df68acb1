#![allow(clippy::unwrap_used, clippy::expect_used)]

use modkit_mapper::{FieldDescriptor, FieldType, Shape, Value};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub id: i64,
}

#[derive(Debug, Default, Shape)]
#[shape(name = "Article")]
pub struct ArticleRow {
    pub id: Uuid,
    pub title: String,
    pub rating: Option<Decimal>,
    pub tag_ids: Vec<i64>,
    #[shape(rename = "body")]
    pub content: String,
    #[shape(read_only)]
    pub slug: String,
    #[shape(write_only)]
    pub password: String,
    #[shape(skip)]
    pub tags: Vec<Tag>,
}

#[test]
fn table_lists_fields_in_declaration_order() {
    let names: Vec<&str> = ArticleRow::fields().iter().map(|f| f.name).collect();

    assert_eq!(
        names,
        ["id", "title", "rating", "tag_ids", "body", "slug", "password"]
    );
    assert_eq!(ArticleRow::NAME, "Article");
}

#[test]
fn table_carries_declared_types_and_access() {
    assert_eq!(
        ArticleRow::field("rating"),
        Some(&FieldDescriptor::new("rating", FieldType::DECIMAL.nullable()))
    );
    assert_eq!(ArticleRow::field("tag_ids").unwrap().ty, FieldType::I64.list());

    let slug = ArticleRow::field("slug").unwrap();
    assert!(slug.readable && !slug.writable);
    let password = ArticleRow::field("password").unwrap();
    assert!(!password.readable && password.writable);

    assert!(ArticleRow::field("tags").is_none());
    assert!(ArticleRow::field("content").is_none());
}

#[test]
fn read_returns_values_for_readable_fields_only() {
    let row = ArticleRow {
        title: "Hello".to_owned(),
        content: "text".to_owned(),
        password: "secret".to_owned(),
        ..ArticleRow::default()
    };

    assert_eq!(row.read("title"), Some(Value::String("Hello".to_owned())));
    assert_eq!(row.read("body"), Some(Value::String("text".to_owned())));
    assert_eq!(row.read("rating"), Some(Value::Null));
    assert_eq!(row.read("password"), None);
    assert_eq!(row.read("tags"), None);
}

#[test]
fn write_accepts_fitting_values_and_rejects_the_rest() {
    let mut row = ArticleRow::default();

    assert!(row.write("title", Value::String("New".to_owned())));
    assert!(row.write("rating", Value::Decimal(Decimal::new(95, 1))));
    assert!(row.write("tag_ids", Value::List(vec![Value::I64(10), Value::I64(20)])));
    assert!(row.write("password", Value::String("hunter2".to_owned())));

    assert!(!row.write("title", Value::Null));
    assert!(!row.write("title", Value::I64(1)));
    assert!(!row.write("slug", Value::String("nope".to_owned())));
    assert!(!row.write("unknown", Value::Bool(true)));

    assert_eq!(row.title, "New");
    assert_eq!(row.rating, Some(Decimal::new(95, 1)));
    assert_eq!(row.tag_ids, vec![10, 20]);
    assert_eq!(row.password, "hunter2");
    assert!(row.slug.is_empty());
}
