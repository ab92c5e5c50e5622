use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use sourced_collection::{
    same_model, Collection, CollectionClass, CollectionEvent, Mixin, ModelRef, Options,
};

use crate::support::{record_events, stooge};

#[test]
fn add_event_carries_model_collection_and_options() {
    let c = Collection::new();
    let seen: Rc<RefCell<Vec<(ModelRef, bool, Options)>>> = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let this = c.clone();
    c.on("add", move |event| {
        if let CollectionEvent::Add {
            model,
            collection,
            options,
        } = event
        {
            log.borrow_mut()
                .push((Rc::clone(model), collection.ptr_eq(&this), options.clone()));
        }
    });

    c.add(json!({"id": 1}), Options::new().merge(false));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(same_model(&seen[0].0, &c.get(1).unwrap()));
    assert!(seen[0].1);
    assert_eq!(seen[0].2.merge, Some(false));
}

#[test]
fn remove_event_fires_once_for_cid_only_models() {
    let c = Collection::new();
    c.add(json!({"name": "anonymous"}), Options::new());
    let member = c.at(0).unwrap();

    let fired = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&fired);
    c.once("remove", move |_| *counter.borrow_mut() += 1);

    c.remove(Rc::clone(&member), Options::new());
    c.remove(member, Options::new());
    assert_eq!(*fired.borrow(), 1);
    assert!(c.is_empty());
}

#[test]
fn plain_values_publish_add_and_remove() {
    let c = Collection::new();
    let seen = record_events(&c);

    c.add(json!({"id": 1}), Options::new());
    c.remove(1, Options::new());
    assert_eq!(*seen.borrow(), vec!["add".to_string(), "remove".to_string()]);
}

#[test]
fn member_changes_are_rethrown() {
    let c = CollectionClass::new()
        .extend([Mixin::new().model(stooge()).indexes(["name"])])
        .create();
    let model = stooge().create(json!({"id": "1", "name": "moe"}));
    let model_ref: ModelRef = model.clone();
    c.add(Rc::clone(&model), Options::new());

    let seen: Rc<RefCell<Vec<(ModelRef, Option<Value>)>>> = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    c.on("change:name", move |event| {
        if let CollectionEvent::Change { model, value, .. } = event {
            log.borrow_mut().push((Rc::clone(model), value.clone()));
        }
    });

    model.set_attr("name", "shmoe");

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert!(same_model(&seen[0].0, &model_ref));
    assert_eq!(seen[0].1, Some(json!("shmoe")));
}

#[test]
fn bare_change_follows_attribute_changes() {
    let c = CollectionClass::new().extend([Mixin::new().model(stooge())]).create();
    let model = stooge().create(json!({"id": "1", "name": "moe"}));
    c.add(Rc::clone(&model), Options::new());
    let seen = record_events(&c);

    model.set_attr("name", "shmoe");
    assert_eq!(
        *seen.borrow(),
        vec!["change:name".to_string(), "change".to_string()]
    );
}

#[test]
fn removed_members_are_not_rethrown() {
    let c = CollectionClass::new().extend([Mixin::new().model(stooge())]).create();
    let model = stooge().create(json!({"id": "1", "name": "moe"}));
    c.add(Rc::clone(&model), Options::new());
    c.remove(Rc::clone(&model), Options::new());
    let seen = record_events(&c);

    model.set_attr("name", "shmoe");
    assert!(seen.borrow().is_empty());
}

#[test]
fn off_stops_delivery() {
    let c = Collection::new();
    let seen = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&seen);
    let id = c.on("add", move |_| *counter.borrow_mut() += 1);

    c.add(json!({"id": 1}), Options::new());
    assert!(c.off(id));
    assert!(!c.off(id));
    c.add(json!({"id": 2}), Options::new());
    assert_eq!(*seen.borrow(), 1);
}

#[test]
fn listeners_may_mutate_the_collection() {
    let c = Collection::new();
    let this = c.clone();
    c.on("add", move |event| {
        if let Some(model) = event.model() {
            if model.get("id") == Some(json!(1)) {
                this.add(json!({"id": 2}), Options::new());
            }
        }
    });

    c.add(json!({"id": 1}), Options::new());
    assert_eq!(c.len(), 2);
    assert!(c.get(2).is_some());
}

#[test]
fn destroy_removes_and_publishes_remove() {
    let c = CollectionClass::new().extend([Mixin::new().model(stooge())]).create();
    let model = stooge().create(json!({"id": "1"}));
    c.add(Rc::clone(&model), Options::new());
    let seen = record_events(&c);

    model.destroy();
    assert!(c.is_empty());
    assert_eq!(*seen.borrow(), vec!["remove".to_string()]);
}

#[test]
fn member_removed_by_an_earlier_model_listener_stays_out_of_indexes() {
    let c = CollectionClass::new()
        .extend([Mixin::new().model(stooge()).indexes(["name"])])
        .create();
    let moe = stooge().create(json!({"id": "1", "name": "moe"}));
    let this = c.clone();
    let member: ModelRef = moe.clone();
    moe.on("change:name", move |_| {
        this.remove(&member, Options::new());
    });
    c.add(Rc::clone(&moe), Options::new());
    let seen = record_events(&c);

    moe.set_attr("name", "larry");

    assert_eq!(c.len(), 0);
    assert!(c.get("1").is_none());
    assert!(c.get_by("larry", "name").is_none());
    assert!(c.get_by("moe", "name").is_none());
    assert_eq!(*seen.borrow(), vec!["remove".to_string()]);
}

#[test]
fn add_listener_may_remove_the_added_model() {
    let c = CollectionClass::new()
        .extend([Mixin::new().model(stooge()).indexes(["name"])])
        .create();
    let this = c.clone();
    c.on("add", move |event| {
        if let Some(model) = event.model() {
            this.remove(model, Options::new());
        }
    });

    let moe = stooge().create(json!({"id": "1", "name": "moe"}));
    c.add(Rc::clone(&moe), Options::new());
    assert_eq!(c.len(), 0);
    assert!(c.get("1").is_none());
    assert!(c.get_by("moe", "name").is_none());

    let seen = record_events(&c);
    moe.set_attr("name", "larry");
    assert!(seen.borrow().is_empty());
    assert!(c.get_by("larry", "name").is_none());
}

#[test]
fn remove_listener_may_add_the_model_back() {
    let c = CollectionClass::new()
        .extend([Mixin::new().model(stooge()).indexes(["name"])])
        .create();
    let moe = stooge().create(json!({"id": "1", "name": "moe"}));
    c.add(Rc::clone(&moe), Options::new());

    let this = c.clone();
    c.once("remove", move |event| {
        if let Some(model) = event.model() {
            this.add(model, Options::new());
        }
    });
    c.remove("1", Options::new());

    assert_eq!(c.len(), 1);
    let member: ModelRef = moe.clone();
    assert!(same_model(&c.get("1").unwrap(), &member));
    assert!(same_model(&c.get_by("moe", "name").unwrap(), &member));

    let seen = record_events(&c);
    moe.set_attr("name", "larry");
    assert!(c.get_by("moe", "name").is_none());
    assert!(same_model(&c.get_by("larry", "name").unwrap(), &member));
    assert_eq!(
        *seen.borrow(),
        vec!["change:name".to_string(), "change".to_string()]
    );
}
