use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use super::ordering::Comparator;
use crate::error::Result;
use crate::model::ModelFactory;

/// Per-call options for `add`, `set`, `remove` and `reset`.
///
/// Unset fields take the operation's default: `add` adds without merging or
/// removing, `set` adds, merges and removes. Events carry a copy of the options
/// the caller passed.
///
/// Deserializable from camelCase JSON, e.g. `{"merge": true, "at": 0}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
    /// Run model validation before adding; failures go to the `invalid` event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate: Option<bool>,
    /// Suppress add/remove/sort/reset events for this call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent: Option<bool>,
    /// `Some(false)` skips comparator placement for this call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<bool>,
    /// Splice new models starting at this position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<usize>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// `add`, `remove` and `merge` all on: the defaults `set` applies.
    pub fn for_set() -> Self {
        Options {
            add: Some(true),
            remove: Some(true),
            merge: Some(true),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn add(mut self, add: bool) -> Self {
        self.add = Some(add);
        self
    }

    pub fn remove(mut self, remove: bool) -> Self {
        self.remove = Some(remove);
        self
    }

    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = Some(merge);
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = Some(silent);
        self
    }

    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn at(mut self, at: usize) -> Self {
        self.at = Some(at);
        self
    }

    pub fn is_silent(&self) -> bool {
        self.silent.unwrap_or(false)
    }

    pub fn validates(&self) -> bool {
        self.validate.unwrap_or(false)
    }
}

/// Per-instance configuration, overriding the collection class.
#[derive(Clone, Default)]
pub struct CollectionOptions {
    pub(crate) parent: Option<Weak<dyn Any>>,
    pub(crate) comparator: Option<Comparator>,
    pub(crate) model: Option<Rc<dyn ModelFactory>>,
    pub(crate) main_index: Option<String>,
    pub(crate) indexes: Option<Vec<String>>,
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-owning back-reference, returned verbatim by `Collection::parent`.
    pub fn parent<T: Any>(mut self, parent: &Rc<T>) -> Self {
        let parent: Weak<T> = Rc::downgrade(parent);
        self.parent = Some(parent);
        self
    }

    pub fn comparator(mut self, comparator: impl Into<Comparator>) -> Self {
        self.comparator = Some(comparator.into());
        self
    }

    pub fn model<F: ModelFactory + 'static>(mut self, factory: F) -> Self {
        self.model = Some(Rc::new(factory));
        self
    }

    pub fn main_index(mut self, name: impl Into<String>) -> Self {
        self.main_index = Some(name.into());
        self
    }

    pub fn indexes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexes = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl fmt::Debug for CollectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionOptions")
            .field("parent", &self.parent.is_some())
            .field("comparator", &self.comparator)
            .field("model", &self.model.is_some())
            .field("main_index", &self.main_index)
            .field("indexes", &self.indexes)
            .finish()
    }
}
