use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use super::{Collection, CollectionEvent, Options};
use crate::error::{CollectionError, Result};
use crate::model::{Model, ModelRef};
use crate::value::{compare_optional, compare_values};

type KeyFn = Rc<dyn Fn(&dyn Model) -> Value>;
type CompareFn = Rc<dyn Fn(&Collection, &dyn Model, &dyn Model) -> Ordering>;

/// How a collection orders its members.
#[derive(Clone)]
pub enum Comparator {
    /// Ascending natural order of an attribute.
    Attribute(String),
    /// Ascending natural order of a key derived from each model.
    Key(KeyFn),
    /// Three-way comparison, evaluated with the collection as context.
    Compare(CompareFn),
}

impl Comparator {
    pub fn attribute(name: impl Into<String>) -> Self {
        Comparator::Attribute(name.into())
    }

    pub fn key<F>(key: F) -> Self
    where
        F: Fn(&dyn Model) -> Value + 'static,
    {
        Comparator::Key(Rc::new(key))
    }

    pub fn compare<F>(compare: F) -> Self
    where
        F: Fn(&Collection, &dyn Model, &dyn Model) -> Ordering + 'static,
    {
        Comparator::Compare(Rc::new(compare))
    }

    /// The attribute name for [`Comparator::Attribute`].
    pub fn attribute_name(&self) -> Option<&str> {
        match self {
            Comparator::Attribute(name) => Some(name.as_str()),
            _ => None,
        }
    }

    fn order(&self, collection: &Collection, a: &dyn Model, b: &dyn Model) -> Ordering {
        match self {
            Comparator::Attribute(name) => {
                compare_optional(a.get(name).as_ref(), b.get(name).as_ref())
            }
            Comparator::Key(key) => compare_values(&key(a), &key(b)),
            Comparator::Compare(compare) => compare(collection, a, b),
        }
    }

    /// Stable sort of `models`.
    fn sort(&self, collection: &Collection, models: &mut Vec<ModelRef>) {
        match self {
            Comparator::Compare(compare) => {
                models.sort_by(|a, b| compare(collection, &**a, &**b));
            }
            _ => {
                let mut keyed: Vec<(Value, ModelRef)> = models
                    .drain(..)
                    .map(|model| (self.sort_key(&*model), model))
                    .collect();
                keyed.sort_by(|(a, _), (b, _)| compare_values(a, b));
                models.extend(keyed.into_iter().map(|(_, model)| model));
            }
        }
    }

    fn sort_key(&self, model: &dyn Model) -> Value {
        match self {
            Comparator::Attribute(name) => model.get(name).unwrap_or(Value::Null),
            Comparator::Key(key) => key(model),
            Comparator::Compare(_) => Value::Null,
        }
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparator::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            Comparator::Key(_) => f.write_str("Key(..)"),
            Comparator::Compare(_) => f.write_str("Compare(..)"),
        }
    }
}

impl From<&str> for Comparator {
    fn from(name: &str) -> Self {
        Comparator::attribute(name)
    }
}

impl From<String> for Comparator {
    fn from(name: String) -> Self {
        Comparator::Attribute(name)
    }
}

impl Collection {
    /// Position at which `model` belongs: after every member that does not
    /// compare greater, so equal members keep their insertion order.
    /// Without a comparator, the end.
    pub(crate) fn sorted_position(&self, model: &ModelRef) -> usize {
        let snapshot = self.models();
        match self.comparator() {
            Some(comparator) => snapshot.partition_point(|member| {
                comparator.order(self, &**member, &**model) != Ordering::Greater
            }),
            None => snapshot.len(),
        }
    }

    /// Re-sort every member with the configured comparator and publish `sort`
    /// unless `options.silent` is set.
    pub fn sort(&self, options: Options) -> Result<()> {
        let comparator = self
            .comparator()
            .cloned()
            .ok_or(CollectionError::NoComparator)?;
        self.resort(&comparator);
        debug!(len = self.len(), "collection sorted");

        if !options.is_silent() {
            self.emit(CollectionEvent::Sort {
                collection: self.clone(),
                options,
            });
        }
        Ok(())
    }

    /// Sorting runs on a snapshot so the comparator may read the collection.
    /// The result is only written back if membership did not change meanwhile.
    pub(crate) fn resort(&self, comparator: &Comparator) {
        let mut sorted = self.models();
        comparator.sort(self, &mut sorted);

        let mut state = self.inner.state.borrow_mut();
        let unchanged = state.models.len() == sorted.len()
            && sorted.iter().all(|model| state.index.contains(model));
        if unchanged {
            state.models = sorted;
        }
    }

    /// `true` when every adjacent pair is in comparator order.
    pub fn is_sorted(&self) -> bool {
        let Some(comparator) = self.comparator() else {
            return true;
        };
        let models = self.models();
        models
            .windows(2)
            .all(|pair| comparator.order(self, &*pair[0], &*pair[1]) != Ordering::Greater)
    }
}
