use serde_json::{json, Value};
use sourced_collection::{
    compare_optional, CollectionClass, CollectionOptions, Comparator, Mixin, Options,
};

use crate::support::{record_events, stooge, stooges};

fn names(c: &sourced_collection::Collection) -> Vec<Value> {
    c.pluck("name").into_iter().flatten().collect()
}

#[test]
fn attribute_comparator_on_construction_and_add() {
    let class = CollectionClass::new().extend([Mixin::new().comparator("name")]);
    let c = class.create_with(stooges(), CollectionOptions::new());
    assert_eq!(names(&c), vec![json!("curly"), json!("larry"), json!("moe")]);

    c.add(json!({"id": "4", "name": "joe"}), Options::new());
    assert_eq!(
        names(&c),
        vec![json!("curly"), json!("joe"), json!("larry"), json!("moe")]
    );
}

#[test]
fn key_comparator() {
    let by_length = Comparator::key(|m| {
        json!(m
            .get("name")
            .and_then(|n| n.as_str().map(str::len))
            .unwrap_or(0))
    });
    let c = CollectionClass::new()
        .extend([Mixin::new().comparator(by_length)])
        .create_with(stooges(), CollectionOptions::new());
    assert_eq!(names(&c), vec![json!("moe"), json!("larry"), json!("curly")]);
}

#[test]
fn descending_compare_comparator() {
    let descending = Comparator::compare(|_, a, b| {
        compare_optional(b.get("name").as_ref(), a.get("name").as_ref())
    });
    let c = CollectionClass::new()
        .extend([Mixin::new().comparator(descending)])
        .create_with(stooges(), CollectionOptions::new());
    assert_eq!(names(&c), vec![json!("moe"), json!("larry"), json!("curly")]);
}

#[test]
fn instance_comparator_overrides_class() {
    let class = CollectionClass::new().extend([Mixin::new().comparator("name")]);
    let c = class.create_with(stooges(), CollectionOptions::new().comparator("id"));
    assert_eq!(c.pluck("id"), vec![Some(json!("1")), Some(json!("2")), Some(json!("3"))]);
}

#[test]
fn add_with_comparator_emits_sort() {
    let c = CollectionClass::new()
        .extend([Mixin::new().comparator("name")])
        .create();
    let seen = record_events(&c);

    c.add(stooges(), Options::new());
    assert_eq!(
        *seen.borrow(),
        vec!["add", "add", "add", "sort"]
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>()
    );
}

#[test]
fn sort_false_appends() {
    let c = CollectionClass::new()
        .extend([Mixin::new().comparator("name")])
        .create();
    let seen = record_events(&c);

    c.add(stooges(), Options::new().sort(false));
    assert_eq!(names(&c), vec![json!("moe"), json!("larry"), json!("curly")]);
    assert!(!seen.borrow().contains(&"sort".to_string()));

    c.sort(Options::new()).unwrap();
    assert_eq!(names(&c), vec![json!("curly"), json!("larry"), json!("moe")]);
}

#[test]
fn merged_change_resorts() {
    let schema = stooge();
    let c = CollectionClass::new()
        .extend([Mixin::new().model(schema).comparator("name")])
        .create_with(stooges(), CollectionOptions::new());

    c.set(
        json!([
            {"id": "1", "name": "aaron"},
            {"id": "2", "name": "larry"},
            {"id": "3", "name": "curly"},
        ]),
        Options::new(),
    );
    assert_eq!(names(&c), vec![json!("aaron"), json!("curly"), json!("larry")]);
    assert!(c.is_sorted());
}

#[test]
fn comparator_may_read_the_collection() {
    let c = CollectionClass::new()
        .extend([Mixin::new().comparator(Comparator::compare(|collection, a, b| {
            assert!(collection.len() <= 3);
            compare_optional(a.get("id").as_ref(), b.get("id").as_ref())
        }))])
        .create();
    c.add(json!([{"id": 3}, {"id": 1}, {"id": 2}]), Options::new());
    c.sort(Options::new()).unwrap();
    assert_eq!(c.pluck("id"), vec![Some(json!(1)), Some(json!(2)), Some(json!(3))]);
}
