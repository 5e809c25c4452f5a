use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use datamodel::{
    Bytes, Context, Datamodel, ErrorKind, FieldValue, FrozenSet, Record, TypeSignature, Union,
    Value,
};
use serde_json::json;

fn tree(value: serde_json::Value) -> Value {
    Value::from(value)
}

fn timestamp(text: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(text).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Datamodel, Debug, Clone, PartialEq)]
struct Event {
    x: i64,
    y: Vec<String>,
    dt: DateTime<FixedOffset>,
}

#[derive(Datamodel, Debug, Clone, PartialEq)]
struct Inventory {
    name: String,
    counts: HashMap<String, Vec<u32>>,
    ordered: BTreeMap<i64, bool>,
    pair: (i64, String),
    tags: HashSet<String>,
    ids: FrozenSet<i64>,
    ratio: Option<f64>,
    raw: Bytes,
    day: NaiveDate,
    extra: Value,
}

fn default_label() -> String {
    "unnamed".to_string()
}

#[derive(Datamodel, Debug, PartialEq)]
struct Settings {
    id: i64,
    #[field(default)]
    retries: u8,
    #[field(default = "default_label")]
    label: String,
    #[field(default, init = false)]
    computed: Vec<i64>,
}

#[derive(Union, Debug, Clone, PartialEq)]
enum IntOrStr {
    Int(i64),
    Str(String),
}

#[derive(Datamodel, Debug, PartialEq)]
struct Holder {
    value: IntOrStr,
    #[field(default)]
    maybe: Option<IntOrStr>,
}

#[derive(Record, Debug, PartialEq)]
struct Small {
    x: i64,
}

#[derive(Record, Debug, PartialEq)]
struct Big {
    x: i64,
    y: String,
}

#[derive(Union, Debug, PartialEq)]
enum Size {
    Small(Small),
    Big(Big),
}

#[derive(Datamodel, Debug, PartialEq)]
struct Parcel {
    v: Size,
}

#[derive(Datamodel, Debug, PartialEq)]
struct Pair {
    pair: (i64, String),
}

#[derive(Datamodel, Debug, PartialEq)]
struct Stamp {
    at: DateTime<FixedOffset>,
    day: NaiveDate,
    utc: DateTime<Utc>,
}

#[derive(Datamodel, Debug, PartialEq)]
struct Collections {
    unique: HashSet<i64>,
    frozen: FrozenSet<String>,
    lookup: HashMap<String, i64>,
}

#[derive(Datamodel, Debug, PartialEq)]
struct Scalars {
    small: i32,
    wide: u64,
    ratio: f64,
    flag: bool,
    text: String,
}

#[derive(Record, Debug, Clone, PartialEq)]
struct Point {
    x: i64,
    y: i64,
}

#[derive(Datamodel, Debug, PartialEq)]
struct Shape {
    name: String,
    points: Vec<Point>,
    #[field(default)]
    origin: Option<Point>,
}

#[derive(Datamodel, Debug, PartialEq)]
struct Node {
    value: i64,
    #[field(default)]
    children: Vec<Node>,
}

#[derive(Record, Debug, PartialEq)]
struct Link {
    label: String,
    #[field(default)]
    next: Option<Box<Link>>,
}

#[derive(Datamodel, Debug, PartialEq)]
struct Chain {
    head: Link,
}

#[derive(Datamodel, Debug, PartialEq)]
struct Page<T> {
    items: Vec<T>,
    total: usize,
}

#[derive(Datamodel, Debug, PartialEq)]
#[datamodel(name = "Catalog")]
struct Library {
    pages: Vec<Page<String>>,
}

fn inventory() -> Inventory {
    Inventory {
        name: "depot".into(),
        counts: HashMap::from([("bolts".to_string(), vec![1, 2]), ("nuts".to_string(), vec![])]),
        ordered: BTreeMap::from([(1, true), (2, false)]),
        pair: (7, "seven".into()),
        tags: HashSet::from(["a".to_string(), "b".to_string()]),
        ids: FrozenSet::from([3, 1, 2]),
        ratio: Some(0.5),
        raw: Bytes::from("payload"),
        day: NaiveDate::from_ymd_opt(2018, 7, 2).unwrap(),
        extra: tree(json!({"k": [1, null, "v"]})),
    }
}

// ---------------------------------------------------------------------------
// Round trips
// ---------------------------------------------------------------------------

#[test]
fn end_to_end_json_matches_expected_text() {
    let ctx = Context::new();
    let event = Event {
        x: 1,
        y: vec!["a".into(), "b".into()],
        dt: timestamp("2018-07-02T12:00:00+00:00"),
    };

    let text = event.to_json_in(&ctx).unwrap();
    assert_eq!(
        text,
        r#"{"x": 1, "y": ["a", "b"], "dt": "2018-07-02T12:00:00+00:00"}"#
    );
    assert_eq!(Event::from_json_in(&ctx, &text).unwrap(), event);
}

#[test]
fn tree_round_trip_preserves_every_field() {
    let ctx = Context::new();
    let original = inventory();
    let tree = original.to_tree_in(&ctx).unwrap();
    assert_eq!(Inventory::from_tree_in(&ctx, &tree).unwrap(), original);
}

#[test]
fn text_round_trip_preserves_every_field() {
    let ctx = Context::new();
    let original = inventory();
    let text = original.to_json_in(&ctx).unwrap();
    assert_eq!(Inventory::from_json_in(&ctx, &text).unwrap(), original);
}

#[test]
fn outbound_tree_follows_declaration_order() {
    let ctx = Context::new();
    let out = inventory().to_tree_in(&ctx).unwrap();
    let keys: Vec<_> = out
        .as_map()
        .unwrap()
        .iter()
        .map(|(k, _)| k.as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        keys,
        ["name", "counts", "ordered", "pair", "tags", "ids", "ratio", "raw", "day", "extra"]
    );
    assert_eq!(out.get("ids"), Some(&tree(json!([1, 2, 3]))));
    assert_eq!(out.get("raw"), Some(&Value::from("payload")));
    assert_eq!(out.get("day"), Some(&Value::from("2018-07-02")));
}

// ---------------------------------------------------------------------------
// Defaulting and forgiveness
// ---------------------------------------------------------------------------

#[test]
fn missing_fields_fall_back_to_defaults_and_unknown_keys_are_dropped() {
    let ctx = Context::new();
    let settings: Settings =
        Settings::from_tree_in(&ctx, &tree(json!({"id": 7, "bogus": true, "computed": [1]})))
            .unwrap();
    assert_eq!(
        settings,
        Settings {
            id: 7,
            retries: 0,
            label: "unnamed".into(),
            computed: vec![],
        }
    );

    let out = settings.to_tree_in(&ctx).unwrap();
    assert_eq!(
        out,
        tree(json!({"id": 7, "retries": 0, "label": "unnamed", "computed": []}))
    );
}

#[test]
fn missing_required_field_is_reported_by_name() {
    let ctx = Context::new();
    let err = Settings::from_tree_in(&ctx, &tree(json!({"retries": 1}))).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::MissingField));
    assert_eq!(err.convert_error().unwrap().path(), "id");
}

#[test]
fn non_map_input_is_a_shape_error() {
    let ctx = Context::new();
    let err = Settings::from_tree_in(&ctx, &tree(json!([1, 2]))).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Shape));
}

// ---------------------------------------------------------------------------
// Unions and optionals
// ---------------------------------------------------------------------------

#[test]
fn union_signature_lists_arms_in_order() {
    assert_eq!(TypeSignature::of::<IntOrStr>().as_str(), "Union<i64, String>");
    assert_eq!(
        TypeSignature::of::<Option<IntOrStr>>().as_str(),
        "Option<Union<i64, String>>"
    );
}

#[test]
fn union_takes_first_arm_that_accepts() {
    let ctx = Context::new();
    let numeric = Holder::from_tree_in(&ctx, &tree(json!({"value": "5"}))).unwrap();
    assert_eq!(numeric.value, IntOrStr::Int(5));
    assert_eq!(numeric.maybe, None);

    let text = Holder::from_tree_in(&ctx, &tree(json!({"value": "abc", "maybe": 3}))).unwrap();
    assert_eq!(text.value, IntOrStr::Str("abc".into()));
    assert_eq!(text.maybe, Some(IntOrStr::Int(3)));
}

#[test]
fn union_outbound_emits_the_carried_value() {
    let ctx = Context::new();
    let holder = Holder {
        value: IntOrStr::Str("5".into()),
        maybe: Some(IntOrStr::Int(2)),
    };
    assert_eq!(
        holder.to_tree_in(&ctx).unwrap(),
        tree(json!({"value": "5", "maybe": 2}))
    );
}

#[test]
fn union_outbound_uses_the_values_own_arm() {
    let ctx = Context::new();
    let big = Parcel {
        v: Size::Big(Big { x: 1, y: "s".into() }),
    };
    assert_eq!(big.to_tree_in(&ctx).unwrap(), tree(json!({"v": {"x": 1, "y": "s"}})));

    let small = Parcel {
        v: Size::Small(Small { x: 2 }),
    };
    assert_eq!(small.to_tree_in(&ctx).unwrap(), tree(json!({"v": {"x": 2}})));
}

#[test]
fn union_with_no_accepting_arm_fails() {
    let ctx = Context::new();
    let err = Holder::from_tree_in(&ctx, &tree(json!({"value": [1]}))).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Union));
    let source = err.convert_error().unwrap();
    assert_eq!(source.path(), "value");
    assert_eq!(source.raw(), Some(&tree(json!([1]))));
}

// ---------------------------------------------------------------------------
// Tuples, sets, mappings
// ---------------------------------------------------------------------------

#[test]
fn tuple_with_wrong_arity_fails() {
    let ctx = Context::new();
    let err = Pair::from_tree_in(&ctx, &tree(json!({"pair": [1, "a", "extra"]}))).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Arity));
    assert_eq!(err.convert_error().unwrap().path(), "pair");

    let ok = Pair::from_tree_in(&ctx, &tree(json!({"pair": ["1", 2]}))).unwrap();
    assert_eq!(ok.pair, (1, "2".to_string()));
}

#[test]
fn sets_collapse_duplicates_and_mappings_accept_pairs() {
    let ctx = Context::new();
    let value = tree(json!({
        "unique": [1, 1, 2],
        "frozen": ["b", "a", "b"],
        "lookup": [["a", 1], ["b", "2"]],
    }));
    let parsed = Collections::from_tree_in(&ctx, &value).unwrap();
    assert_eq!(parsed.unique, HashSet::from([1, 2]));
    assert_eq!(parsed.frozen, FrozenSet::from(["a".to_string(), "b".to_string()]));
    assert_eq!(
        parsed.lookup,
        HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)])
    );

    let out = parsed.to_tree_in(&ctx).unwrap();
    assert_eq!(out.get("frozen"), Some(&tree(json!(["a", "b"]))));
}

#[test]
fn malformed_pair_reports_its_index() {
    let ctx = Context::new();
    let value = tree(json!({"unique": [], "frozen": [], "lookup": [["a", 1], ["b"]]}));
    let err = Collections::from_tree_in(&ctx, &value).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Shape));
    assert_eq!(err.convert_error().unwrap().path(), "lookup[1]");
}

// ---------------------------------------------------------------------------
// Primitives and temporal values
// ---------------------------------------------------------------------------

#[test]
fn primitives_are_coerced_on_inbound() {
    let ctx = Context::new();
    let value = tree(json!({
        "small": "42",
        "wide": 7.9,
        "ratio": 3,
        "flag": "false",
        "text": 5,
    }));
    let parsed = Scalars::from_tree_in(&ctx, &value).unwrap();
    assert_eq!(
        parsed,
        Scalars {
            small: 42,
            wide: 7,
            ratio: 3.0,
            flag: false,
            text: "5".into(),
        }
    );
}

#[test]
fn failed_coercion_names_field_and_raw_value() {
    let ctx = Context::new();
    let value = tree(json!({"small": "abc", "wide": 1, "ratio": 1, "flag": true, "text": ""}));
    let err = Scalars::from_tree_in(&ctx, &value).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Coercion));
    let source = err.convert_error().unwrap();
    assert_eq!(source.path(), "small");
    assert_eq!(source.raw(), Some(&Value::from("abc")));
}

#[test]
fn out_of_range_integer_is_rejected() {
    let ctx = Context::new();
    let value = tree(json!({"small": 1, "wide": -1, "ratio": 1, "flag": true, "text": ""}));
    let err = Scalars::from_tree_in(&ctx, &value).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Coercion));
}

#[test]
fn temporal_values_round_trip_unchanged() {
    let ctx = Context::new();
    let value = tree(json!({
        "at": "2018-07-02T12:00:00+00:00",
        "day": "2018-07-02",
        "utc": "2018-07-02T14:30:00.250000+02:00",
    }));
    let stamp = Stamp::from_tree_in(&ctx, &value).unwrap();
    assert_eq!(stamp.at, timestamp("2018-07-02T12:00:00+00:00"));

    let out = stamp.to_tree_in(&ctx).unwrap();
    assert_eq!(out.get("at"), Some(&Value::from("2018-07-02T12:00:00+00:00")));
    assert_eq!(out.get("day"), Some(&Value::from("2018-07-02")));
    assert_eq!(out.get("utc"), Some(&Value::from("2018-07-02T12:30:00.250000+00:00")));
}

#[test]
fn typed_temporal_values_are_accepted() {
    let ctx = Context::new();
    let dt = timestamp("2018-07-02T12:00:00+00:00");
    let value = Value::map([
        ("at", Value::DateTime(dt)),
        ("day", Value::DateTime(dt)),
        ("utc", Value::DateTime(dt)),
    ]);
    let stamp = Stamp::from_tree_in(&ctx, &value).unwrap();
    assert_eq!(stamp.day, NaiveDate::from_ymd_opt(2018, 7, 2).unwrap());
}

#[test]
fn malformed_timestamp_is_a_temporal_error() {
    let ctx = Context::new();
    let value = tree(json!({"at": "yesterday", "day": "2018-07-02", "utc": "2018-07-02T12:00:00Z"}));
    let err = Stamp::from_tree_in(&ctx, &value).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Temporal));
    assert_eq!(err.convert_error().unwrap().path(), "at");
}

// ---------------------------------------------------------------------------
// Nested, recursive and generic records
// ---------------------------------------------------------------------------

#[test]
fn plain_records_nest_inside_datamodels() {
    let ctx = Context::new();
    let shape = Shape {
        name: "triangle".into(),
        points: vec![Point { x: 0, y: 0 }, Point { x: 1, y: 0 }, Point { x: 0, y: 1 }],
        origin: Some(Point { x: 0, y: 0 }),
    };
    let out = shape.to_tree_in(&ctx).unwrap();
    assert_eq!(out.get("origin"), Some(&tree(json!({"x": 0, "y": 0}))));
    assert_eq!(Shape::from_tree_in(&ctx, &out).unwrap(), shape);
}

#[test]
fn nested_errors_carry_the_full_path() {
    let ctx = Context::new();
    let value = tree(json!({"name": "s", "points": [{"x": 0, "y": 0}, {"x": "bad", "y": 0}]}));
    let err = Shape::from_tree_in(&ctx, &value).unwrap_err();
    assert_eq!(err.convert_error().unwrap().path(), "points[1].x");
}

#[test]
fn plain_records_have_no_cached_plan() {
    let ctx = Context::new();
    ctx.declare::<Shape>().unwrap();
    assert!(ctx.cached_plan(std::any::TypeId::of::<Shape>()).is_some());
    assert!(ctx.cached_plan(std::any::TypeId::of::<Point>()).is_none());
}

#[test]
fn recursive_datamodels_round_trip() {
    let ctx = Context::new();
    let value = tree(json!({
        "value": 1,
        "children": [
            {"value": 2, "children": [{"value": 4}]},
            {"value": 3},
        ],
    }));
    let node = Node::from_tree_in(&ctx, &value).unwrap();
    assert_eq!(node.children[0].children[0].value, 4);
    assert!(node.children[1].children.is_empty());

    let back = Node::from_tree_in(&ctx, &node.to_tree_in(&ctx).unwrap()).unwrap();
    assert_eq!(back, node);
}

#[test]
fn recursive_plain_records_round_trip() {
    let ctx = Context::new();
    let value = tree(json!({"head": {"label": "a", "next": {"label": "b", "next": {"label": "c"}}}}));
    let chain = Chain::from_tree_in(&ctx, &value).unwrap();
    let labels: Vec<_> = std::iter::successors(Some(&chain.head), |l| l.next.as_deref())
        .map(|l| l.label.as_str())
        .collect();
    assert_eq!(labels, ["a", "b", "c"]);

    let out = chain.to_tree_in(&ctx).unwrap();
    assert_eq!(
        out,
        tree(json!({"head": {"label": "a", "next": {"label": "b", "next": {"label": "c", "next": null}}}}))
    );
}

#[test]
fn recursive_plain_records_keep_the_hooks_of_their_plan() {
    let ctx = Context::new();
    ctx.declare::<Chain>().unwrap();
    ctx.register_structure_hook("String", |_| Ok(FieldValue::Str("HOOKED".into())));

    let value = tree(json!({"head": {"label": "a", "next": {"label": "b", "next": {"label": "c"}}}}));
    for _ in 0..2 {
        let chain = Chain::from_tree_in(&ctx, &value).unwrap();
        let labels: Vec<_> = std::iter::successors(Some(&chain.head), |l| l.next.as_deref())
            .map(|l| l.label.as_str())
            .collect();
        assert_eq!(labels, ["a", "b", "c"]);
    }
}

#[test]
fn generic_records_get_one_plan_per_instantiation() {
    let ctx = Context::new();
    let ints = ctx.declare::<Page<i64>>().unwrap();
    let strings = ctx.declare::<Page<String>>().unwrap();
    assert_eq!(ints.signature().as_str(), "Page<i64>");
    assert_eq!(strings.signature().as_str(), "Page<String>");

    let page: Page<i64> = Page::from_tree_in(&ctx, &tree(json!({"items": ["1", 2], "total": 2}))).unwrap();
    assert_eq!(page.items, vec![1, 2]);
}

#[test]
fn renamed_records_use_their_declared_name() {
    let ctx = Context::new();
    let plan = ctx.declare::<Library>().unwrap();
    assert_eq!(plan.signature().as_str(), "Catalog");
    assert_eq!(plan.fields()[0].signature().as_str(), "Vec<Page<String>>");
}

#[test]
fn global_context_backs_the_plain_methods() {
    let event = Event {
        x: 2,
        y: vec![],
        dt: timestamp("2020-01-01T00:00:00-05:00"),
    };
    let text = event.to_json().unwrap();
    assert_eq!(text, r#"{"x": 2, "y": [], "dt": "2020-01-01T00:00:00-05:00"}"#);
    assert_eq!(Event::from_json(&text).unwrap(), event);
}
