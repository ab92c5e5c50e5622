//! Models - the records a collection indexes and orders.
//!
//! A model is anything implementing [`Model`]: a correlation identifier, an
//! identity attribute, attribute reads and merges, and serialization to a
//! plain value. Observable models additionally expose a change stream via
//! [`Model::events`]; collections subscribe to it to keep their indexes live.
//!
//! Two implementations ship with the crate:
//!
//! - [`PlainModel`] wraps raw data with no change stream. Collections without
//!   a model factory use it for every plain value they receive.
//! - [`Record`] is a fully observable model built from a [`Schema`].
//!
//! ## Example
//!
//! ```ignore
//! use sourced_collection::{Schema, Model};
//! use serde_json::json;
//!
//! let stooge = Schema::builder().build();
//! let moe = stooge.create(json!({"id": "1", "name": "moe"}));
//! moe.on("change:name", |event| println!("{:?}", event));
//! moe.set_attr("name", "shmoe");
//! ```

mod cid;
mod plain;
mod record;

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::emitter::{Event, EventEmitter};
use crate::error::ValidationError;

pub use cid::{Cid, CidGenerator};
pub use plain::PlainModel;
pub use record::{Record, Schema, SchemaBuilder};

/// Identity attribute used when a model type does not name one.
pub const DEFAULT_ID_ATTRIBUTE: &str = "id";

pub type Attributes = Map<String, Value>;

/// Shared handle to a model. A model may belong to several collections at once.
pub type ModelRef = Rc<dyn Model>;

pub trait Model: Any {
    fn cid(&self) -> Cid;

    fn id_attribute(&self) -> &str {
        DEFAULT_ID_ATTRIBUTE
    }

    /// Current value of `attribute`. `None` when absent or null.
    fn get(&self, attribute: &str) -> Option<Value>;

    fn id(&self) -> Option<Value> {
        self.get(self.id_attribute())
    }

    /// Merge `attributes` into the model. A null value unsets the attribute.
    /// Returns `true` if anything changed.
    fn set(&self, attributes: &Attributes) -> bool;

    fn serialize(&self) -> Value;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// The model's change stream, if it is observable.
    fn events(&self) -> Option<&EventEmitter<ModelEvent>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("cid", &self.cid())
            .field("data", &self.serialize())
            .finish()
    }
}

/// Identity comparison: `true` only when both handles point at the same model.
pub fn same_model(a: &ModelRef, b: &ModelRef) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Borrow a model as its concrete type.
pub fn downcast<T: Model>(model: &ModelRef) -> Option<&T> {
    model.as_any().downcast_ref::<T>()
}

/// Events published on a model's change stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// `change:<attribute>`; `value` is `None` when the attribute was unset.
    Change {
        attribute: String,
        previous: Option<Value>,
        value: Option<Value>,
    },
    /// `change`, once per `set` that changed anything.
    Changed,
    /// `destroy`; collections drop destroyed members.
    Destroy,
}

impl Event for ModelEvent {
    fn event_type(&self) -> Cow<'_, str> {
        match self {
            ModelEvent::Change { attribute, .. } => Cow::Owned(format!("change:{}", attribute)),
            ModelEvent::Changed => Cow::Borrowed("change"),
            ModelEvent::Destroy => Cow::Borrowed("destroy"),
        }
    }
}

/// Builds models from raw data. A collection configured with a factory
/// uses it for every plain value it receives.
pub trait ModelFactory {
    fn id_attribute(&self) -> &str {
        DEFAULT_ID_ATTRIBUTE
    }

    fn build(&self, attributes: Value) -> ModelRef;
}

impl<T: ModelFactory + ?Sized> ModelFactory for Rc<T> {
    fn id_attribute(&self) -> &str {
        (**self).id_attribute()
    }

    fn build(&self, attributes: Value) -> ModelRef {
        (**self).build(attributes)
    }
}

/// A [`ModelFactory`] backed by a closure.
pub struct FnFactory<F> {
    id_attribute: String,
    build: F,
}

impl<F> FnFactory<F>
where
    F: Fn(Value) -> ModelRef,
{
    pub fn new(build: F) -> Self {
        FnFactory {
            id_attribute: DEFAULT_ID_ATTRIBUTE.to_string(),
            build,
        }
    }

    pub fn with_id_attribute(mut self, id_attribute: impl Into<String>) -> Self {
        self.id_attribute = id_attribute.into();
        self
    }
}

impl<F> ModelFactory for FnFactory<F>
where
    F: Fn(Value) -> ModelRef,
{
    fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    fn build(&self, attributes: Value) -> ModelRef {
        (self.build)(attributes)
    }
}

/// Shorthand for an `Rc<dyn ModelFactory>` around a closure.
pub fn factory_fn<F>(build: F) -> Rc<dyn ModelFactory>
where
    F: Fn(Value) -> ModelRef + 'static,
{
    Rc::new(FnFactory::new(build))
}
