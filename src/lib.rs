mod collection;
mod emitter;
mod error;
mod model;
mod value;

pub use collection::{
    Collection, CollectionClass, CollectionEvent, CollectionOptions, Comparator, Input, Inputs,
    Method, Mixin, MixinConfig, Options, Queries, Query,
};
pub use emitter::{Event, EventEmitter, ListenerId, ALL};
pub use error::{CollectionError, Result, ValidationError};
pub use model::{
    downcast, factory_fn, same_model, Attributes, Cid, CidGenerator, FnFactory, Model,
    ModelEvent, ModelFactory, ModelRef, PlainModel, Record, Schema, SchemaBuilder,
    DEFAULT_ID_ATTRIBUTE,
};
pub use value::{compare_optional, compare_values, index_key};
