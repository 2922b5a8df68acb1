#![allow(clippy::unwrap_used, clippy::expect_used)]

//! End-to-end behavior of the mapping engine: convention resolution, profiles,
//! cache accounting, and contract narrowing.

use std::sync::Arc;

use figment::Figment;
use figment::providers::Serialized;
use modkit_mapper::{
    ContractHandle, Expr, Mapper, MapperConfig, MapperError, MappingContractExt, ProfileError,
    RelationAwareMapping, Shape, Transform,
};
use rust_decimal::Decimal;
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, Shape)]
struct Product {
    id: i64,
    name: String,
    score: Decimal,
    related_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Shape)]
struct ProductSummary {
    id: i64,
    name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Shape)]
struct ProductScore {
    id: i64,
    score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Shape)]
struct ProductCard {
    id: i64,
    name: String,
    headline: String,
    badge: Option<String>,
}

fn product(score: Decimal) -> Product {
    Product {
        id: 1,
        name: "A".to_owned(),
        score,
        related_ids: vec![10, 20],
    }
}

fn rounding() -> Transform {
    Transform::new::<Decimal, i64>(Expr::param().round().to_i64())
}

#[test]
fn same_named_assignable_fields_are_copied() {
    // Arrange
    let mapper = Mapper::<Product>::default();

    // Act
    let summary: ProductSummary = mapper.project_now(&product(Decimal::new(95, 1)));

    // Assert
    assert_eq!(
        summary,
        ProductSummary {
            id: 1,
            name: "A".to_owned()
        }
    );
}

#[test]
fn unmatched_destination_fields_keep_defaults() {
    let mapper = Mapper::<Product>::default();

    let card: ProductCard = mapper.project_now(&product(Decimal::ONE));

    assert_eq!(card.id, 1);
    assert_eq!(card.name, "A");
    assert_eq!(card.headline, "");
    assert_eq!(card.badge, None);
}

#[test]
fn type_mismatch_without_profile_is_skipped() {
    let mapper = Mapper::<Product>::default();

    let score: ProductScore = mapper.project_now(&product(Decimal::new(96, 1)));

    assert_eq!(score, ProductScore { id: 1, score: 0 });
}

#[test]
fn rounding_profile_is_applied() {
    let mut mapper = Mapper::<Product>::default();
    mapper.register_profile("score", rounding()).unwrap();

    let rounded_up: ProductScore = mapper.project_now(&product(Decimal::new(96, 1)));
    let midpoint: ProductScore = mapper.project_now(&product(Decimal::new(95, 1)));
    let rounded_down: ProductScore = mapper.project_now(&product(Decimal::new(94, 1)));

    assert_eq!(rounded_up, ProductScore { id: 1, score: 10 });
    assert_eq!(midpoint.score, 10);
    assert_eq!(rounded_down.score, 9);
}

#[test]
fn second_projection_reuses_compiled_tree() {
    let mapper = Mapper::<Product>::default();
    let entity = product(Decimal::ONE);

    let _first: ProductSummary = mapper.project_now(&entity);
    let builds_after_first = mapper.cache_stats().builds;
    let _second: ProductSummary = mapper.project_now(&entity);

    let stats = mapper.cache_stats();
    assert_eq!(builds_after_first, 1);
    assert_eq!(stats.builds, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[test]
fn registration_invalidates_cached_projections() {
    let mut mapper = Mapper::<Product>::default();
    let entity = product(Decimal::new(96, 1));

    let before: ProductScore = mapper.project_now(&entity);
    mapper.register_profile("score", rounding()).unwrap();
    let after: ProductScore = mapper.project_now(&entity);

    assert_eq!(before.score, 0);
    assert_eq!(after.score, 10);
    let stats = mapper.cache_stats();
    assert_eq!(stats.builds, 2);
    assert_eq!(stats.invalidations, 1);
}

#[test]
fn re_registration_invalidates_too() {
    let mut mapper = Mapper::<Product>::default();
    mapper.register_profile("score", rounding()).unwrap();
    let _warm: ProductScore = mapper.project_now(&product(Decimal::ONE));

    mapper.register_profile("score", rounding()).unwrap();
    let _again: ProductScore = mapper.project_now(&product(Decimal::ONE));

    assert_eq!(mapper.cache_stats().invalidations, 2);
    assert_eq!(mapper.cache_stats().builds, 2);
    assert_eq!(mapper.profiles().len(), 1);
}

#[test]
fn nested_selector_is_rejected_and_nothing_changes() {
    let mut mapper = Mapper::<Product>::default();
    let _warm: ProductSummary = mapper.project_now(&product(Decimal::ONE));

    let err = mapper
        .register_profile("category.name", rounding())
        .unwrap_err();

    assert!(matches!(
        err,
        MapperError::Configuration(ProfileError::NestedMember { .. })
    ));
    assert!(mapper.profiles().is_empty());
    assert_eq!(mapper.cache_stats().invalidations, 0);
}

#[test]
fn profile_with_wrong_source_type_is_a_configuration_error() {
    let mut mapper = Mapper::<Product>::default();

    let err = mapper.register_profile("name", rounding()).unwrap_err();

    assert!(matches!(
        err,
        MapperError::Configuration(ProfileError::SourceTypeMismatch { .. })
    ));
    assert!(err.to_string().contains("name"));
}

#[test]
fn build_projection_exposes_spliced_tree() {
    let mut mapper = Mapper::<Product>::default();
    mapper.register_profile("score", rounding()).unwrap();

    let projection = mapper.build_projection::<ProductScore>();

    assert!(projection.is_translatable());
    assert_eq!(projection.referenced_members(), ["id", "score"]);
    assert_eq!(
        projection.to_string(),
        "Product -> ProductScore { id: id, score: to_i64(round(score)) }"
    );
}

#[test]
fn reverse_mapping_uses_plain_convention() {
    let mut mapper = Mapper::<Product>::default();
    mapper.register_profile("score", rounding()).unwrap();
    let score = ProductScore { id: 5, score: 7 };

    let entity = mapper.map_to_entity(&score);

    // i64 -> Decimal has no profile in this direction
    assert_eq!(
        entity,
        Product {
            id: 5,
            ..Product::default()
        }
    );
}

#[test]
fn batch_mapping_is_lazy_and_order_preserving() {
    let mapper = Mapper::<Product>::default();
    let entities: Vec<Product> = (1..=3)
        .map(|id| Product {
            id,
            name: format!("P{id}"),
            ..Product::default()
        })
        .collect();

    let mut summaries = mapper.map_all_to_destination::<ProductSummary, _>(&entities);
    assert_eq!(mapper.cache_stats().builds, 1);
    let first = summaries.next().unwrap();
    let rest: Vec<ProductSummary> = summaries.collect();

    assert_eq!(first.name, "P1");
    assert_eq!(
        rest.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![2, 3]
    );
    assert_eq!(mapper.map_all_to_destination::<ProductSummary, _>(&[]).count(), 0);
}

#[test]
fn concurrent_projection_converges_to_one_entry() {
    let mut mapper = Mapper::<Product>::default();
    mapper.register_profile("score", rounding()).unwrap();
    let mapper = Arc::new(mapper);
    let entity = product(Decimal::new(96, 1));

    let results: Vec<ProductScore> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let mapper = Arc::clone(&mapper);
                let entity = &entity;
                scope.spawn(move || {
                    (0..50)
                        .map(|_| mapper.project_now::<ProductScore>(entity))
                        .last()
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(results.iter().all(|r| *r == ProductScore { id: 1, score: 10 }));
    let stats = mapper.cache_stats();
    assert!((1..=8).contains(&stats.builds));
    assert_eq!(stats.hits + stats.misses, 400);

    let _after: ProductScore = mapper.project_now(&entity);
    assert_eq!(mapper.cache_stats().builds, stats.builds);
}

#[test]
fn convention_contract_cannot_be_narrowed_to_relation_aware() {
    let mapper = Arc::new(Mapper::<Product>::default());
    let handle = ContractHandle::new(mapper.convention::<ProductSummary>());

    let summary = handle.map_to_destination(&product(Decimal::ONE));
    let Err(err) = handle.narrow_to::<dyn RelationAwareMapping<Product, ProductSummary>>() else {
        panic!("convention contracts are not relation aware");
    };

    assert_eq!(summary.name, "A");
    assert!(err.requested.contains("RelationAwareMapping"));
    assert!(err.to_string().contains("does not implement"));
}

#[test]
fn convention_contract_batches_through_ext_trait() {
    let mapper = Arc::new(Mapper::<Product>::default());
    let contract = mapper.convention::<ProductSummary>();
    let summaries = [
        ProductSummary {
            id: 1,
            name: "A".to_owned(),
        },
        ProductSummary {
            id: 2,
            name: "B".to_owned(),
        },
    ];

    let entities: Vec<Product> = contract.map_all_to_entity(&summaries).collect();

    assert_eq!(entities.len(), 2);
    assert_eq!(entities[1].name, "B");
    assert!(entities[1].related_ids.is_empty());
}

#[test]
fn disabled_cache_from_config_rebuilds_every_time() {
    let figment = Figment::new().merge(Serialized::defaults(json!({
        "mapper": { "cache": { "enabled": false } }
    })));
    let config = MapperConfig::from_figment(&figment).unwrap();
    let mapper = Mapper::<Product>::new(config);

    for _ in 0..3 {
        let summary: ProductSummary = mapper.project_now(&product(Decimal::ONE));
        assert_eq!(summary.id, 1);
    }

    assert_eq!(mapper.cache_stats().builds, 3);
    assert_eq!(mapper.cache_stats().hits, 0);
}
