//! Integration tests for collections.

mod events;
mod models;
mod ordering;
mod validation;

use serde_json::json;
use sourced_collection::{Collection, Options};

#[test]
fn basics() {
    let c = Collection::new();
    assert!(c.is_collection());
    assert!(c.is_empty());

    let obj = json!({"hey": "there"});
    c.add(obj.clone(), Options::new());
    assert_eq!(c.len(), 1);
    assert_eq!(c.at(0).unwrap().serialize(), obj);
}

#[test]
fn add_and_get_by_id() {
    let c = Collection::new();
    c.add(json!([{"id": "47"}, {"id": "48"}]), Options::new());

    assert_eq!(c.len(), 2);
    assert_eq!(c.get("47").unwrap().serialize(), json!({"id": "47"}));
    assert_eq!(c.get("48").unwrap().serialize(), json!({"id": "48"}));
}

#[test]
fn get_returns_the_member_instance() {
    let c = Collection::new();
    let added = c.add(json!({"id": 7}), Options::new());
    let member = added[0].clone().unwrap();
    assert!(sourced_collection::same_model(&c.get(7).unwrap(), &member));
}

#[test]
fn serialize_round_trips_plain_values() {
    let input = json!([{"id": "thing"}, {"id": "other", "n": [1, 2]}]);
    let c = Collection::with_models(input.clone());
    assert_eq!(c.serialize(), input);
    assert_eq!(serde_json::to_value(&c).unwrap(), input);
}

#[test]
fn parent_is_a_weak_back_reference() {
    use sourced_collection::{CollectionClass, CollectionOptions};
    use std::rc::Rc;

    struct Owner {
        name: &'static str,
    }

    let owner = Rc::new(Owner { name: "owner" });
    let c = CollectionClass::new().create_with_options(CollectionOptions::new().parent(&owner));
    assert_eq!(c.parent_as::<Owner>().unwrap().name, "owner");
    assert!(c.parent_as::<String>().is_none());

    drop(owner);
    assert!(c.parent().is_none());
}

#[test]
fn proxied_array_methods() {
    let c = Collection::with_models(json!([{"id": 1, "n": 2}, {"id": 2, "n": 4}]));

    let doubled = c.map(|m| m.get("n").and_then(|n| n.as_i64()).unwrap_or(0) * 2);
    assert_eq!(doubled, vec![4, 8]);
    assert_eq!(c.filter(|m| m.get("n") == Some(json!(4))).len(), 1);
    assert_eq!(c.first().unwrap().id(), Some(json!(1)));
    assert_eq!(c.last().unwrap().id(), Some(json!(2)));
    assert_eq!(c.index_of(&c.get(2).unwrap()), Some(1));
    assert_eq!(c.iter().count(), 2);
}
