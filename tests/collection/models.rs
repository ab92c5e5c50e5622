use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use sourced_collection::{
    downcast, factory_fn, Attributes, Cid, CollectionClass, Mixin, Model, ModelRef, Options,
};

/// A hand-written model that keeps its raw attributes.
struct Bag {
    cid: Cid,
    attributes: RefCell<Attributes>,
}

impl Bag {
    fn build(data: Value) -> ModelRef {
        Rc::new(Bag {
            cid: Cid::next(),
            attributes: RefCell::new(data.as_object().cloned().unwrap_or_default()),
        })
    }
}

impl Model for Bag {
    fn cid(&self) -> Cid {
        self.cid
    }

    fn get(&self, attribute: &str) -> Option<Value> {
        self.attributes.borrow().get(attribute).cloned()
    }

    fn set(&self, attributes: &Attributes) -> bool {
        let mut current = self.attributes.borrow_mut();
        let before = current.clone();
        current.extend(attributes.clone());
        *current != before
    }

    fn serialize(&self) -> Value {
        Value::Object(self.attributes.borrow().clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn model_factory_builds_members() {
    let c = CollectionClass::new()
        .extend([Mixin::new().model(factory_fn(Bag::build))])
        .create();
    c.add(json!({"name": "moe"}), Options::new());

    let member = c.at(0).unwrap();
    assert!(downcast::<Bag>(&member).is_some());
    assert_eq!(member.get("name"), Some(json!("moe")));
}

#[test]
fn extend_merges_multiple_mixins() {
    let class = CollectionClass::new().extend([
        Mixin::new().method("hello", |_, _| json!("world")),
        Mixin::new().method("hi", |_, _| json!("there")),
        Mixin::new().method("count", |c, _| json!(c.len())),
    ]);
    let c = class.create_with(json!([{"id": 1}, {"id": 2}]), Default::default());

    assert_eq!(c.invoke("hello", &[]), Some(json!("world")));
    assert_eq!(c.invoke("hi", &[]), Some(json!("there")));
    assert_eq!(c.invoke("count", &[]), Some(json!(2)));
}

#[test]
fn methods_receive_arguments() {
    let class = CollectionClass::new().extend([Mixin::new().method("pluck", |c, args| {
        let attribute = args.first().and_then(Value::as_str).unwrap_or("id");
        Value::Array(c.pluck(attribute).into_iter().flatten().collect())
    })]);
    let c = class.create_with(json!([{"id": 1, "n": "a"}, {"id": 2, "n": "b"}]), Default::default());
    assert_eq!(c.invoke("pluck", &[json!("n")]), Some(json!(["a", "b"])));
}

#[test]
fn merge_into_custom_model_reindexes() {
    let c = CollectionClass::new()
        .extend([Mixin::new().model(factory_fn(Bag::build)).indexes(["name"])])
        .create();
    c.add(json!({"id": 1, "name": "moe"}), Options::new());
    c.add(json!({"id": 1, "name": "curly"}), Options::new().merge(true));

    assert_eq!(c.len(), 1);
    assert!(c.get_by("moe", "name").is_none());
    assert_eq!(c.get_by("curly", "name").unwrap().get("id"), Some(json!(1)));
}
