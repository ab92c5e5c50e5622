use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Collection, CollectionOptions, Comparator, Config, Inputs};
use crate::error::Result;
use crate::model::{ModelFactory, DEFAULT_ID_ATTRIBUTE};

/// A method merged into a collection class, called through [`Collection::invoke`].
pub type Method = Rc<dyn Fn(&Collection, &[Value]) -> Value>;

/// A bundle of configuration and methods merged into a [`CollectionClass`].
/// Fields left unset do not override earlier mixins.
#[derive(Clone, Default)]
pub struct Mixin {
    model: Option<Rc<dyn ModelFactory>>,
    main_index: Option<String>,
    indexes: Option<Vec<String>>,
    comparator: Option<Comparator>,
    methods: BTreeMap<String, Method>,
}

impl Mixin {
    pub fn new() -> Self {
        Self::default()
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

    pub fn comparator(mut self, comparator: impl Into<Comparator>) -> Self {
        self.comparator = Some(comparator.into());
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Collection, &[Value]) -> Value + 'static,
    {
        self.methods.insert(name.into(), Rc::new(method));
        self
    }

    /// Overlay `other` onto `self`; `other` wins on every key it sets.
    pub fn merge(mut self, other: Mixin) -> Self {
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.main_index.is_some() {
            self.main_index = other.main_index;
        }
        if other.indexes.is_some() {
            self.indexes = other.indexes;
        }
        if other.comparator.is_some() {
            self.comparator = other.comparator;
        }
        self.methods.extend(other.methods);
        self
    }
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixin")
            .field("model", &self.model.is_some())
            .field("main_index", &self.main_index)
            .field("indexes", &self.indexes)
            .field("comparator", &self.comparator)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The data half of a [`Mixin`], loadable from JSON such as
/// `{"mainIndex": "_id", "indexes": ["username"], "comparator": "name"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MixinConfig {
    pub main_index: Option<String>,
    pub indexes: Option<Vec<String>>,
    /// Attribute to sort by.
    pub comparator: Option<String>,
}

impl MixinConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<MixinConfig> for Mixin {
    fn from(config: MixinConfig) -> Self {
        Mixin {
            main_index: config.main_index,
            indexes: config.indexes,
            comparator: config.comparator.map(Comparator::Attribute),
            ..Mixin::default()
        }
    }
}

/// A collection "class": the merged result of every mixin applied so far.
/// Merging happens once in [`CollectionClass::extend`], never per instance.
#[derive(Clone, Default, Debug)]
pub struct CollectionClass {
    definition: Rc<Mixin>,
}

impl CollectionClass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a new class with `mixins` merged in order, last wins.
    pub fn extend<I>(&self, mixins: I) -> CollectionClass
    where
        I: IntoIterator<Item = Mixin>,
    {
        let definition = mixins
            .into_iter()
            .fold((*self.definition).clone(), Mixin::merge);
        debug!(
            methods = definition.methods.len(),
            main_index = ?definition.main_index,
            "collection class extended"
        );
        CollectionClass {
            definition: Rc::new(definition),
        }
    }

    /// The main index instances get unless their options override it.
    pub fn main_index(&self) -> String {
        resolve_main_index(None, &self.definition)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.definition.methods.contains_key(name)
    }

    pub fn create(&self) -> Collection {
        self.build(CollectionOptions::new(), None)
    }

    /// A new instance, populated silently from `initial`.
    pub fn create_with(&self, initial: impl Into<Inputs>, options: CollectionOptions) -> Collection {
        self.build(options, Some(initial.into()))
    }

    pub fn create_with_options(&self, options: CollectionOptions) -> Collection {
        self.build(options, None)
    }

    fn build(&self, options: CollectionOptions, initial: Option<Inputs>) -> Collection {
        let definition = &*self.definition;
        let model = options.model.clone().or_else(|| definition.model.clone());
        let main_index = match &options.main_index {
            Some(name) => name.clone(),
            None => resolve_main_index(model.as_deref(), definition),
        };

        let mut indexes = vec![main_index.clone()];
        let declared = options
            .indexes
            .as_ref()
            .or(definition.indexes.as_ref())
            .into_iter()
            .flatten();
        for name in declared {
            if !indexes.contains(name) {
                indexes.push(name.clone());
            }
        }

        let config = Config {
            model,
            main_index,
            indexes,
            comparator: options
                .comparator
                .clone()
                .or_else(|| definition.comparator.clone()),
            methods: definition.methods.clone(),
        };
        Collection::from_config(config, options.parent, initial)
    }
}

fn resolve_main_index(model: Option<&dyn ModelFactory>, definition: &Mixin) -> String {
    if let Some(name) = &definition.main_index {
        return name.clone();
    }
    match model.or(definition.model.as_deref()) {
        Some(factory) => factory.id_attribute().to_string(),
        None => DEFAULT_ID_ATTRIBUTE.to_string(),
    }
}
