use std::any::Any;
use std::cell::RefCell;

use serde_json::Value;

use super::{Attributes, Cid, Model, DEFAULT_ID_ATTRIBUTE};

/// Minimal wrapper for raw data: a stable cid, attribute access and
/// pass-through serialization. It has no change stream.
#[derive(Debug)]
pub struct PlainModel {
    cid: Cid,
    id_attribute: String,
    data: RefCell<Value>,
}

impl PlainModel {
    pub fn new(data: Value) -> Self {
        Self::with_id_attribute(data, DEFAULT_ID_ATTRIBUTE)
    }

    pub fn with_id_attribute(data: Value, id_attribute: impl Into<String>) -> Self {
        PlainModel {
            cid: Cid::next(),
            id_attribute: id_attribute.into(),
            data: RefCell::new(data),
        }
    }

    /// A copy of the wrapped value.
    pub fn data(&self) -> Value {
        self.data.borrow().clone()
    }
}

impl Model for PlainModel {
    fn cid(&self) -> Cid {
        self.cid
    }

    fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    fn get(&self, attribute: &str) -> Option<Value> {
        self.data
            .borrow()
            .as_object()
            .and_then(|object| object.get(attribute))
            .filter(|value| !value.is_null())
            .cloned()
    }

    fn set(&self, attributes: &Attributes) -> bool {
        let mut data = self.data.borrow_mut();
        let Some(object) = data.as_object_mut() else {
            return false;
        };

        let mut changed = false;
        for (name, value) in attributes {
            if value.is_null() {
                changed |= object.remove(name).is_some();
            } else if object.get(name) != Some(value) {
                object.insert(name.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }

    fn serialize(&self) -> Value {
        self.data()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
