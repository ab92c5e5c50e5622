use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use sourced_collection::{
    CollectionClass, CollectionEvent, Mixin, Options, Schema, ValidationError,
};

fn always_invalid() -> Schema {
    Schema::builder()
        .id_attribute("_id")
        .validator(|_| Err(ValidationError::from("fail")))
        .build()
}

#[test]
fn add_with_validate_enforces_validation() {
    let c = CollectionClass::new()
        .extend([Mixin::new().model(always_invalid())])
        .create();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let this = c.clone();
    c.on("invalid", move |event| {
        if let CollectionEvent::Invalid {
            collection,
            error,
            options,
        } = event
        {
            log.borrow_mut().push((
                collection.ptr_eq(&this),
                error.message.clone(),
                options.validate,
            ));
        }
    });

    let result = c.add(json!({"_id": "a"}), Options::new().validate(true));

    assert_eq!(c.len(), 0);
    assert_eq!(result.len(), 1);
    assert!(result[0].is_none());
    assert_eq!(*seen.borrow(), vec![(true, "fail".to_string(), Some(true))]);
}

#[test]
fn validation_is_opt_in() {
    let c = CollectionClass::new()
        .extend([Mixin::new().model(always_invalid())])
        .create();
    c.add(json!({"_id": "a"}), Options::new());
    assert_eq!(c.len(), 1);
}

#[test]
fn valid_items_in_a_batch_still_land() {
    let schema = Schema::builder()
        .validator(|attrs| match attrs.get("name") {
            Some(_) => Ok(()),
            None => Err(ValidationError::new("name is required")),
        })
        .build();
    let c = CollectionClass::new().extend([Mixin::new().model(schema)]).create();

    let result = c.add(
        json!([{"id": 1, "name": "moe"}, {"id": 2}, {"id": 3, "name": "curly"}]),
        Options::new().validate(true),
    );
    assert_eq!(result.iter().filter(|r| r.is_some()).count(), 2);
    assert_eq!(c.len(), 2);
    assert!(c.get(2).is_none());
}
