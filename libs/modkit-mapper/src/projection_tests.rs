use rust_decimal::Decimal;
use tracing_test::traced_test;

use super::*;
use crate::Shape;
use crate::profile::Transform;

#[derive(Debug, Default, Shape)]
struct Reading {
    id: i64,
    label: String,
    level: Decimal,
    note: Option<String>,
}

#[derive(Debug, Default, PartialEq, Shape)]
struct ReadingView {
    id: i64,
    label: Option<String>,
    level: i64,
    missing: String,
    absent: Option<i64>,
    #[shape(read_only)]
    computed: i64,
}

fn reading() -> Reading {
    Reading {
        id: 7,
        label: "north".to_owned(),
        level: Decimal::new(25, 1),
        note: None,
    }
}

#[test]
fn resolve_follows_destination_declaration_order() {
    let resolutions = resolve::<Reading, ReadingView>(None);

    let fields: Vec<&str> = resolutions
        .iter()
        .map(|r| match r {
            Resolution::Bound(b) => b.field,
            Resolution::Unbound(u) => u.field,
        })
        .collect();
    // read-only destination fields are not constructor parameters
    assert_eq!(fields, ["id", "label", "level", "missing", "absent"]);
}

#[test]
fn resolve_binds_required_source_into_nullable_destination() {
    let projection = Projection::build_convention::<Reading, ReadingView>();

    let label = projection.binding("label").unwrap();
    assert_eq!(label.kind, BindingKind::Direct);
    assert_eq!(label.expr, Expr::member("label"));
}

#[test]
fn resolve_reports_type_mismatch_without_profile() {
    let projection = Projection::build_convention::<Reading, ReadingView>();

    let level = projection
        .unbound
        .iter()
        .find(|u| u.field == "level")
        .unwrap();
    assert_eq!(
        level.reason,
        UnboundReason::TypeMismatch {
            source: FieldType::DECIMAL
        }
    );
    assert!(
        projection
            .unbound
            .iter()
            .any(|u| u.field == "missing" && u.reason == UnboundReason::NoSource)
    );
}

#[test]
fn build_splices_profile_body_over_source_member() {
    let mut profiles = ProfileRegistry::<Reading>::new();
    profiles
        .register(
            &"level".into(),
            Transform::new::<Decimal, i64>(Expr::param().round().to_i64()),
        )
        .unwrap();

    let projection = Projection::build::<Reading, ReadingView>(&profiles);

    let level = projection.binding("level").unwrap();
    assert_eq!(level.kind, BindingKind::Profile);
    assert_eq!(level.expr.to_string(), "to_i64(round(level))");
    assert!(!level.expr.contains_param());
    assert!(projection.is_translatable());
}

#[test]
fn evaluate_copies_bound_fields_and_defaults_the_rest() {
    let mut profiles = ProfileRegistry::<Reading>::new();
    profiles
        .register(
            &"level".into(),
            Transform::new::<Decimal, i64>(Expr::param().round().to_i64()),
        )
        .unwrap();
    let projection = Projection::build::<Reading, ReadingView>(&profiles);

    let view: ReadingView = projection.evaluate(&reading());

    assert_eq!(
        view,
        ReadingView {
            id: 7,
            label: Some("north".to_owned()),
            level: 3,
            missing: String::new(),
            absent: None,
            computed: 0,
        }
    );
}

#[test]
fn referenced_members_are_deduplicated() {
    let projection = Projection {
        source: "Reading",
        target: "ReadingView",
        bindings: vec![
            Binding {
                field: "label",
                ty: FieldType::STRING,
                kind: BindingKind::Profile,
                expr: Expr::member("label").concat(Expr::member("note")),
            },
            Binding {
                field: "note",
                ty: FieldType::STRING.nullable(),
                kind: BindingKind::Direct,
                expr: Expr::member("note"),
            },
        ],
        unbound: Vec::new(),
    };

    assert_eq!(projection.referenced_members(), ["label", "note"]);
    assert_eq!(
        projection.to_string(),
        "Reading -> ReadingView { label: concat(label, note), note: note }"
    );
}

#[test]
#[traced_test]
fn warn_policy_lists_required_unbound_fields() {
    let projection = Projection::build_convention::<Reading, ReadingView>();

    projection.report_unbound(UnboundPolicy::Warn);

    assert!(logs_contain("destination fields left at their default values"));
    assert!(logs_contain("missing"));
    assert!(!logs_contain("absent"));
}

#[test]
#[traced_test]
fn ignore_policy_stays_silent() {
    let projection = Projection::build_convention::<Reading, ReadingView>();

    projection.report_unbound(UnboundPolicy::Ignore);

    assert!(!logs_contain("destination fields left at their default values"));
}
