use std::rc::Rc;

use serde_json::Value;

use super::index::IndexStore;
use super::Collection;
use crate::model::{Attributes, Cid, ModelRef, PlainModel, Record};
use crate::value::index_key;

/// One item handed to `add`, `set` or `reset`: raw data or a model instance.
#[derive(Debug, Clone)]
pub enum Input {
    Data(Value),
    Model(ModelRef),
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Data(value)
    }
}

impl From<ModelRef> for Input {
    fn from(model: ModelRef) -> Self {
        Input::Model(model)
    }
}

impl From<&ModelRef> for Input {
    fn from(model: &ModelRef) -> Self {
        Input::Model(Rc::clone(model))
    }
}

impl From<Rc<Record>> for Input {
    fn from(record: Rc<Record>) -> Self {
        Input::Model(record)
    }
}

impl From<Rc<PlainModel>> for Input {
    fn from(model: Rc<PlainModel>) -> Self {
        Input::Model(model)
    }
}

/// A single item or a sequence of items. A JSON array is a sequence.
#[derive(Debug, Clone, Default)]
pub struct Inputs(Vec<Input>);

impl Inputs {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for Inputs {
    type Item = Input;
    type IntoIter = std::vec::IntoIter<Input>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Value> for Inputs {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Inputs(items.into_iter().map(Input::Data).collect()),
            other => Inputs(vec![Input::Data(other)]),
        }
    }
}

impl From<Input> for Inputs {
    fn from(input: Input) -> Self {
        Inputs(vec![input])
    }
}

impl From<Vec<Input>> for Inputs {
    fn from(inputs: Vec<Input>) -> Self {
        Inputs(inputs)
    }
}

impl From<Vec<Value>> for Inputs {
    fn from(values: Vec<Value>) -> Self {
        Inputs(values.into_iter().map(Input::Data).collect())
    }
}

impl From<ModelRef> for Inputs {
    fn from(model: ModelRef) -> Self {
        Inputs(vec![Input::Model(model)])
    }
}

impl From<&ModelRef> for Inputs {
    fn from(model: &ModelRef) -> Self {
        Inputs(vec![Input::from(model)])
    }
}

impl From<Vec<ModelRef>> for Inputs {
    fn from(models: Vec<ModelRef>) -> Self {
        Inputs(models.into_iter().map(Input::Model).collect())
    }
}

impl From<Rc<Record>> for Inputs {
    fn from(record: Rc<Record>) -> Self {
        Inputs(vec![Input::from(record)])
    }
}

impl From<Vec<Rc<Record>>> for Inputs {
    fn from(records: Vec<Rc<Record>>) -> Self {
        Inputs(records.into_iter().map(Input::from).collect())
    }
}

impl From<Rc<PlainModel>> for Inputs {
    fn from(model: Rc<PlainModel>) -> Self {
        Inputs(vec![Input::from(model)])
    }
}

/// What `get` and `remove` look up: a key (or an object carrying the
/// main-index attribute or a `cid`), a cid, or a model reference.
#[derive(Debug, Clone)]
pub enum Query {
    Key(Value),
    Cid(Cid),
    Model(ModelRef),
}

impl From<Value> for Query {
    fn from(value: Value) -> Self {
        Query::Key(value)
    }
}

impl From<&str> for Query {
    fn from(key: &str) -> Self {
        Query::Key(Value::from(key))
    }
}

impl From<String> for Query {
    fn from(key: String) -> Self {
        Query::Key(Value::from(key))
    }
}

impl From<i32> for Query {
    fn from(key: i32) -> Self {
        Query::Key(Value::from(key))
    }
}

impl From<i64> for Query {
    fn from(key: i64) -> Self {
        Query::Key(Value::from(key))
    }
}

impl From<u64> for Query {
    fn from(key: u64) -> Self {
        Query::Key(Value::from(key))
    }
}

impl From<Cid> for Query {
    fn from(cid: Cid) -> Self {
        Query::Cid(cid)
    }
}

impl From<ModelRef> for Query {
    fn from(model: ModelRef) -> Self {
        Query::Model(model)
    }
}

impl From<&ModelRef> for Query {
    fn from(model: &ModelRef) -> Self {
        Query::Model(Rc::clone(model))
    }
}

impl From<Rc<Record>> for Query {
    fn from(record: Rc<Record>) -> Self {
        Query::Model(record)
    }
}

impl From<&Rc<Record>> for Query {
    fn from(record: &Rc<Record>) -> Self {
        Query::Model(Rc::clone(record) as ModelRef)
    }
}

impl From<Rc<PlainModel>> for Query {
    fn from(model: Rc<PlainModel>) -> Self {
        Query::Model(model)
    }
}

/// One or more lookups. A JSON array is a sequence of keys.
#[derive(Debug, Clone, Default)]
pub struct Queries(Vec<Query>);

impl IntoIterator for Queries {
    type Item = Query;
    type IntoIter = std::vec::IntoIter<Query>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Value> for Queries {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Queries(items.into_iter().map(Query::Key).collect()),
            other => Queries(vec![Query::Key(other)]),
        }
    }
}

impl From<Query> for Queries {
    fn from(query: Query) -> Self {
        Queries(vec![query])
    }
}

impl From<Vec<Query>> for Queries {
    fn from(queries: Vec<Query>) -> Self {
        Queries(queries)
    }
}

impl From<Vec<ModelRef>> for Queries {
    fn from(models: Vec<ModelRef>) -> Self {
        Queries(models.into_iter().map(Query::Model).collect())
    }
}

impl From<Vec<Rc<Record>>> for Queries {
    fn from(records: Vec<Rc<Record>>) -> Self {
        Queries(records.into_iter().map(Query::from).collect())
    }
}

macro_rules! single_query {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Queries {
                fn from(query: $ty) -> Self {
                    Queries(vec![Query::from(query)])
                }
            }
        )*
    };
}

single_query!(&str, String, i32, i64, u64, Cid, ModelRef, &ModelRef, Rc<Record>, &Rc<Record>, Rc<PlainModel>);

/// A candidate member produced from an [`Input`].
pub(crate) struct Resolved {
    pub model: ModelRef,
    /// The raw attributes when the input was plain data.
    pub attributes: Option<Attributes>,
}

impl Resolved {
    /// Attributes to merge into an existing member with the same identity.
    pub fn merge_attributes(&self) -> Option<Attributes> {
        match &self.attributes {
            Some(attributes) => Some(attributes.clone()),
            None => self.model.serialize().as_object().cloned(),
        }
    }
}

impl Collection {
    /// Turn an input into a model: model instances pass through, raw data goes
    /// to the model factory, or into a [`PlainModel`] when there is none.
    pub(crate) fn resolve(&self, input: Input) -> Resolved {
        match input {
            Input::Model(model) => Resolved {
                model,
                attributes: None,
            },
            Input::Data(value) => {
                let attributes = value.as_object().cloned();
                let model: ModelRef = match self.model_factory() {
                    Some(factory) => factory.build(value),
                    None => Rc::new(PlainModel::with_id_attribute(value, self.main_index())),
                };
                Resolved { model, attributes }
            }
        }
    }

    /// The member sharing `model`'s identity: the same instance, or the member
    /// holding its main-index key.
    pub(crate) fn existing(&self, model: &ModelRef) -> Option<ModelRef> {
        let state = self.inner.state.borrow();
        if state.index.contains(model) {
            return Some(Rc::clone(model));
        }
        let key = IndexStore::key_for(&**model, self.main_index());
        state.index.value(self.main_index(), &key)
    }

    /// Resolve a query through `index` (default: the main index), falling
    /// back to the cid channel.
    pub(crate) fn lookup(&self, query: &Query, index: Option<&str>) -> Option<ModelRef> {
        let main = self.main_index();
        let index = index.unwrap_or(main);
        let state = self.inner.state.borrow();
        let store = &state.index;

        match query {
            Query::Cid(cid) => store.by_cid(&cid.to_string()),
            Query::Model(model) => {
                if store.contains(model) {
                    return Some(Rc::clone(model));
                }
                let key = IndexStore::key_for(&**model, index);
                store.value(index, &key)
            }
            Query::Key(Value::Object(object)) => object
                .get(index)
                .and_then(index_key)
                .and_then(|key| store.value(index, &key))
                .or_else(|| {
                    object
                        .get("cid")
                        .and_then(Value::as_str)
                        .and_then(|cid| store.by_cid(cid))
                }),
            Query::Key(value) => {
                let key = index_key(value)?;
                if !store.has_index(index) {
                    return store.by_cid(&key);
                }
                store.value(index, &key).or_else(|| store.by_cid(&key))
            }
        }
    }
}
