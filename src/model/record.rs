use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::{Attributes, Cid, Model, ModelEvent, ModelFactory, ModelRef, DEFAULT_ID_ATTRIBUTE};
use crate::emitter::{EventEmitter, ListenerId};
use crate::error::ValidationError;

type Compute = Rc<dyn Fn(&Attributes) -> Option<Value>>;
type Validator = Rc<dyn Fn(&Attributes) -> Result<(), ValidationError>>;

struct Derived {
    name: String,
    deps: Vec<String>,
    compute: Compute,
}

struct SchemaDef {
    id_attribute: String,
    defaults: Attributes,
    derived: Vec<Derived>,
    validator: Option<Validator>,
}

/// Describes a kind of [`Record`]: its identity attribute, defaults, derived
/// attributes and validation. Cheap to clone.
#[derive(Clone)]
pub struct Schema {
    def: Rc<SchemaDef>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn id_attribute(&self) -> &str {
        &self.def.id_attribute
    }

    pub fn is_derived(&self, attribute: &str) -> bool {
        self.def.derived.iter().any(|d| d.name == attribute)
    }

    pub fn create(&self, attributes: Value) -> Rc<Record> {
        Record::new(self, attributes)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Schema::builder().build()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("id_attribute", &self.def.id_attribute)
            .field("defaults", &self.def.defaults)
            .field(
                "derived",
                &self.def.derived.iter().map(|d| &d.name).collect::<Vec<_>>(),
            )
            .field("validator", &self.def.validator.is_some())
            .finish()
    }
}

impl ModelFactory for Schema {
    fn id_attribute(&self) -> &str {
        &self.def.id_attribute
    }

    fn build(&self, attributes: Value) -> ModelRef {
        self.create(attributes)
    }
}

pub struct SchemaBuilder {
    id_attribute: String,
    defaults: Attributes,
    derived: Vec<Derived>,
    validator: Option<Validator>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        SchemaBuilder {
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            defaults: Attributes::new(),
            derived: Vec::new(),
            validator: None,
        }
    }
}

impl SchemaBuilder {
    pub fn id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = name.into();
        self
    }

    pub fn default_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    /// A read-only attribute computed from `deps`. It is recomputed whenever a
    /// dependency changes (or on every change when `deps` is empty) and emits
    /// its own `change:<name>` when its value moves.
    pub fn derived<F>(mut self, name: impl Into<String>, deps: &[&str], compute: F) -> Self
    where
        F: Fn(&Attributes) -> Option<Value> + 'static,
    {
        self.derived.push(Derived {
            name: name.into(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            compute: Rc::new(compute),
        });
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Attributes) -> Result<(), ValidationError> + 'static,
    {
        self.validator = Some(Rc::new(validator));
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            def: Rc::new(SchemaDef {
                id_attribute: self.id_attribute,
                defaults: self.defaults,
                derived: self.derived,
                validator: self.validator,
            }),
        }
    }
}

/// An observable model. Every attribute change is published on its change
/// stream as `change:<attribute>` followed by a single `change`.
pub struct Record {
    cid: Cid,
    schema: Schema,
    attributes: RefCell<Attributes>,
    derived: RefCell<Attributes>,
    events: EventEmitter<ModelEvent>,
}

impl Record {
    pub fn new(schema: &Schema, attributes: Value) -> Rc<Record> {
        let mut initial = schema.def.defaults.clone();
        if let Value::Object(object) = attributes {
            for (name, value) in object {
                if !value.is_null() {
                    initial.insert(name, value);
                }
            }
        }

        let mut derived = Attributes::new();
        for d in &schema.def.derived {
            if let Some(value) = (d.compute)(&initial) {
                derived.insert(d.name.clone(), value);
            }
        }

        Rc::new(Record {
            cid: Cid::next(),
            schema: schema.clone(),
            attributes: RefCell::new(initial),
            derived: RefCell::new(derived),
            events: EventEmitter::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// A copy of the stored (non-derived) attributes.
    pub fn attributes(&self) -> Attributes {
        self.attributes.borrow().clone()
    }

    pub fn set_attr(&self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let value = value.into();
        let value = if value.is_null() { None } else { Some(value) };
        self.apply(vec![(name.into(), value)])
    }

    pub fn unset(&self, name: impl Into<String>) -> bool {
        self.apply(vec![(name.into(), None)])
    }

    pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&ModelEvent) + 'static,
    {
        self.events.on(event, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Announce that the record is gone. Collections holding it remove it.
    pub fn destroy(&self) {
        self.events.emit(&ModelEvent::Destroy);
    }

    fn apply(&self, changes: Vec<(String, Option<Value>)>) -> bool {
        let mut events = Vec::new();
        {
            let mut attributes = self.attributes.borrow_mut();
            let mut touched = HashSet::new();
            for (name, value) in changes {
                if self.schema.is_derived(&name) {
                    continue;
                }
                let previous = attributes.get(&name).cloned();
                if previous == value {
                    continue;
                }
                match &value {
                    Some(v) => attributes.insert(name.clone(), v.clone()),
                    None => attributes.remove(&name),
                };
                touched.insert(name.clone());
                events.push(ModelEvent::Change {
                    attribute: name,
                    previous,
                    value,
                });
            }

            if events.is_empty() {
                return false;
            }

            let mut derived = self.derived.borrow_mut();
            for d in &self.schema.def.derived {
                if !d.deps.is_empty() && !d.deps.iter().any(|dep| touched.contains(dep)) {
                    continue;
                }
                let value = (d.compute)(&attributes);
                let previous = derived.get(&d.name).cloned();
                if previous == value {
                    continue;
                }
                match &value {
                    Some(v) => derived.insert(d.name.clone(), v.clone()),
                    None => derived.remove(&d.name),
                };
                events.push(ModelEvent::Change {
                    attribute: d.name.clone(),
                    previous,
                    value,
                });
            }
        }

        for event in &events {
            self.events.emit(event);
        }
        self.events.emit(&ModelEvent::Changed);
        true
    }
}

impl Model for Record {
    fn cid(&self) -> Cid {
        self.cid
    }

    fn id_attribute(&self) -> &str {
        self.schema.id_attribute()
    }

    fn get(&self, attribute: &str) -> Option<Value> {
        if let Some(value) = self.attributes.borrow().get(attribute) {
            return Some(value.clone());
        }
        self.derived.borrow().get(attribute).cloned()
    }

    fn set(&self, attributes: &Attributes) -> bool {
        let changes = attributes
            .iter()
            .map(|(name, value)| {
                let value = if value.is_null() {
                    None
                } else {
                    Some(value.clone())
                };
                (name.clone(), value)
            })
            .collect();
        self.apply(changes)
    }

    fn serialize(&self) -> Value {
        Value::Object(self.attributes())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        match &self.schema.def.validator {
            Some(validator) => validator(&self.attributes()),
            None => Ok(()),
        }
    }

    fn events(&self) -> Option<&EventEmitter<ModelEvent>> {
        Some(&self.events)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("cid", &self.cid)
            .field("attributes", &self.attributes.borrow())
            .field("derived", &self.derived.borrow())
            .finish()
    }
}
