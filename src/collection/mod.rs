//! Collections - ordered, indexed, observable sets of models.
//!
//! A [`Collection`] keeps its members in insertion or comparator order,
//! deduplicates them by the main index, maintains any secondary indexes, and
//! publishes `add`, `remove`, `change:<attr>`, `invalid`, `sort` and `reset`
//! events. Attribute changes on observable members are picked up through the
//! member's change stream and reindexed immediately.
//!
//! ## Example
//!
//! ```ignore
//! use sourced_collection::{CollectionClass, Mixin, Options};
//! use serde_json::json;
//!
//! let users = CollectionClass::new().extend([Mixin::new().indexes(["username"])]);
//! let c = users.create();
//! c.add(json!([{"id": 1, "username": "larry"}]), Options::new());
//!
//! assert!(c.get(1).is_some());
//! assert!(c.get_by("larry", "username").is_some());
//! ```

mod class;
mod index;
mod mutation;
mod options;
mod ordering;
mod resolver;

use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::emitter::{Event, EventEmitter, ListenerId};
use crate::error::ValidationError;
use crate::model::{same_model, Cid, ModelFactory, ModelRef};

use index::IndexStore;

pub use class::{CollectionClass, Method, Mixin, MixinConfig};
pub use options::{CollectionOptions, Options};
pub use ordering::Comparator;
pub use resolver::{Input, Inputs, Queries, Query};

/// Configuration resolved once when a collection is created.
pub(crate) struct Config {
    model: Option<Rc<dyn ModelFactory>>,
    main_index: String,
    indexes: Vec<String>,
    comparator: Option<Comparator>,
    methods: BTreeMap<String, Method>,
}

struct State {
    models: Vec<ModelRef>,
    index: IndexStore,
    subscriptions: HashMap<Cid, ListenerId>,
}

struct Inner {
    config: Config,
    parent: Option<Weak<dyn Any>>,
    state: RefCell<State>,
    events: EventEmitter<CollectionEvent>,
}

/// Handle to a collection. Clones share the same collection.
#[derive(Clone)]
pub struct Collection {
    inner: Rc<Inner>,
}

impl Collection {
    /// Marks any instance as a collection.
    pub const IS_COLLECTION: bool = true;

    pub fn new() -> Self {
        CollectionClass::new().create()
    }

    /// A base collection populated (silently) from `initial`.
    pub fn with_models(initial: impl Into<Inputs>) -> Self {
        CollectionClass::new().create_with(initial, CollectionOptions::new())
    }

    pub(crate) fn from_config(
        config: Config,
        parent: Option<Weak<dyn Any>>,
        initial: Option<Inputs>,
    ) -> Self {
        let index = IndexStore::new(&config.indexes);
        let collection = Collection {
            inner: Rc::new(Inner {
                config,
                parent,
                state: RefCell::new(State {
                    models: Vec::new(),
                    index,
                    subscriptions: HashMap::new(),
                }),
                events: EventEmitter::new(),
            }),
        };
        if let Some(initial) = initial {
            collection.reset(initial, Options::new().silent(true));
        }
        collection
    }

    pub fn is_collection(&self) -> bool {
        Self::IS_COLLECTION
    }

    /// `true` when both handles refer to the same collection.
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn main_index(&self) -> &str {
        &self.inner.config.main_index
    }

    /// Configured index names; always includes the main index.
    pub fn indexes(&self) -> &[String] {
        &self.inner.config.indexes
    }

    pub fn comparator(&self) -> Option<&Comparator> {
        self.inner.config.comparator.as_ref()
    }

    pub fn model_factory(&self) -> Option<&Rc<dyn ModelFactory>> {
        self.inner.config.model.as_ref()
    }

    pub fn parent(&self) -> Option<Rc<dyn Any>> {
        self.inner.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn parent_as<T: Any>(&self) -> Option<Rc<T>> {
        self.parent().and_then(|parent| parent.downcast::<T>().ok())
    }

    pub fn on<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&CollectionEvent) + 'static,
    {
        self.inner.events.on(event, listener)
    }

    pub fn once<F>(&self, event: impl Into<String>, listener: F) -> ListenerId
    where
        F: Fn(&CollectionEvent) + 'static,
    {
        self.inner.events.once(event, listener)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    pub(crate) fn emit(&self, event: CollectionEvent) {
        self.inner.events.emit(&event);
    }

    pub fn len(&self) -> usize {
        self.inner.state.borrow().models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Member at position `i`, or `None` when out of range.
    pub fn at(&self, i: usize) -> Option<ModelRef> {
        self.inner.state.borrow().models.get(i).cloned()
    }

    pub fn first(&self) -> Option<ModelRef> {
        self.at(0)
    }

    pub fn last(&self) -> Option<ModelRef> {
        self.inner.state.borrow().models.last().cloned()
    }

    /// Snapshot of the members in order.
    pub fn models(&self) -> Vec<ModelRef> {
        self.inner.state.borrow().models.clone()
    }

    /// Iterates a snapshot, so callbacks may mutate the collection.
    pub fn iter(&self) -> std::vec::IntoIter<ModelRef> {
        self.models().into_iter()
    }

    /// Look up a member through the main index (or the cid channel).
    pub fn get(&self, query: impl Into<Query>) -> Option<ModelRef> {
        self.lookup(&query.into(), None)
    }

    /// Look up a member through a named index. An unknown index name only
    /// resolves cid references.
    pub fn get_by(&self, query: impl Into<Query>, index: &str) -> Option<ModelRef> {
        self.lookup(&query.into(), Some(index))
    }

    pub fn contains(&self, model: &ModelRef) -> bool {
        self.inner.state.borrow().index.contains(model)
    }

    pub fn index_of(&self, model: &ModelRef) -> Option<usize> {
        self.inner
            .state
            .borrow()
            .models
            .iter()
            .position(|m| same_model(m, model))
    }

    pub fn for_each<F: FnMut(&ModelRef)>(&self, mut f: F) {
        for model in self.iter() {
            f(&model);
        }
    }

    /// Alias of [`Collection::for_each`].
    pub fn each<F: FnMut(&ModelRef)>(&self, f: F) {
        self.for_each(f)
    }

    pub fn map<T, F: FnMut(&ModelRef) -> T>(&self, mut f: F) -> Vec<T> {
        self.iter().map(|model| f(&model)).collect()
    }

    pub fn filter<F: FnMut(&ModelRef) -> bool>(&self, mut f: F) -> Vec<ModelRef> {
        self.iter().filter(|model| f(model)).collect()
    }

    pub fn find<F: FnMut(&ModelRef) -> bool>(&self, mut f: F) -> Option<ModelRef> {
        self.iter().find(|model| f(model))
    }

    pub fn count_where<F: FnMut(&ModelRef) -> bool>(&self, mut f: F) -> usize {
        self.iter().filter(|model| f(model)).count()
    }

    /// Each member's value for `attribute`, in order.
    pub fn pluck(&self, attribute: &str) -> Vec<Option<Value>> {
        self.map(|model| model.get(attribute))
    }

    /// Plain value of the collection: each member's own serialized form, in order.
    pub fn serialize(&self) -> Value {
        Value::Array(self.map(|model| model.serialize()))
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.inner.config.methods.contains_key(name)
    }

    /// Call a method merged in through a [`Mixin`].
    pub fn invoke(&self, name: &str, args: &[Value]) -> Option<Value> {
        let method = self.inner.config.methods.get(name).cloned()?;
        Some(method(self, args))
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Collection::serialize(self).serialize(serializer)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("main_index", &self.main_index())
            .field("indexes", &self.indexes())
            .field("comparator", &self.comparator())
            .field("len", &self.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = ModelRef;
    type IntoIter = std::vec::IntoIter<ModelRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Events published by a collection.
#[derive(Debug, Clone)]
pub enum CollectionEvent {
    Add {
        model: ModelRef,
        collection: Collection,
        options: Options,
    },
    /// `index` is the position the model occupied.
    Remove {
        model: ModelRef,
        collection: Collection,
        index: usize,
        options: Options,
    },
    /// A member's change, re-published as `change:<attribute>` (or `change`).
    Change {
        model: ModelRef,
        attribute: Option<String>,
        value: Option<Value>,
    },
    Invalid {
        collection: Collection,
        error: ValidationError,
        options: Options,
    },
    Sort {
        collection: Collection,
        options: Options,
    },
    Reset {
        collection: Collection,
        previous: Vec<ModelRef>,
        options: Options,
    },
}

impl CollectionEvent {
    pub fn model(&self) -> Option<&ModelRef> {
        match self {
            CollectionEvent::Add { model, .. }
            | CollectionEvent::Remove { model, .. }
            | CollectionEvent::Change { model, .. } => Some(model),
            _ => None,
        }
    }

    pub fn collection(&self) -> Option<&Collection> {
        match self {
            CollectionEvent::Add { collection, .. }
            | CollectionEvent::Remove { collection, .. }
            | CollectionEvent::Invalid { collection, .. }
            | CollectionEvent::Sort { collection, .. }
            | CollectionEvent::Reset { collection, .. } => Some(collection),
            CollectionEvent::Change { .. } => None,
        }
    }

    pub fn options(&self) -> Option<&Options> {
        match self {
            CollectionEvent::Add { options, .. }
            | CollectionEvent::Remove { options, .. }
            | CollectionEvent::Invalid { options, .. }
            | CollectionEvent::Sort { options, .. }
            | CollectionEvent::Reset { options, .. } => Some(options),
            CollectionEvent::Change { .. } => None,
        }
    }
}

impl Event for CollectionEvent {
    fn event_type(&self) -> Cow<'_, str> {
        match self {
            CollectionEvent::Add { .. } => Cow::Borrowed("add"),
            CollectionEvent::Remove { .. } => Cow::Borrowed("remove"),
            CollectionEvent::Change {
                attribute: Some(attribute),
                ..
            } => Cow::Owned(format!("change:{}", attribute)),
            CollectionEvent::Change { attribute: None, .. } => Cow::Borrowed("change"),
            CollectionEvent::Invalid { .. } => Cow::Borrowed("invalid"),
            CollectionEvent::Sort { .. } => Cow::Borrowed("sort"),
            CollectionEvent::Reset { .. } => Cow::Borrowed("reset"),
        }
    }
}
