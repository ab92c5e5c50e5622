use std::collections::HashSet;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use super::index::IndexStore;
use super::{Collection, CollectionEvent, Inputs, Options, Queries, Query};
use crate::emitter::ALL;
use crate::model::{same_model, Attributes, Cid, ModelEvent, ModelRef};
use crate::value::index_key;

/// The add/remove/merge switches of a call, with the operation's defaults applied.
#[derive(Debug, Clone, Copy)]
struct Plan {
    add: bool,
    remove: bool,
    merge: bool,
}

impl Plan {
    fn add(options: &Options) -> Self {
        Plan {
            add: options.add.unwrap_or(true),
            remove: options.remove.unwrap_or(false),
            merge: options.merge.unwrap_or(false),
        }
    }

    fn set(options: &Options) -> Self {
        Plan {
            add: options.add.unwrap_or(true),
            remove: options.remove.unwrap_or(true),
            merge: options.merge.unwrap_or(true),
        }
    }
}

impl Collection {
    /// Add one or more models. Items whose main-index key is already present
    /// are skipped (or merged with `merge: true`). Returns, per input, the
    /// member it resolved to, or `None` when it was rejected by validation.
    pub fn add(&self, inputs: impl Into<Inputs>, options: Options) -> Vec<Option<ModelRef>> {
        let plan = Plan::add(&options);
        self.apply(inputs.into(), options, plan)
    }

    /// Reconcile membership with `inputs`: absent items are added, present
    /// ones merged, and members missing from `inputs` removed.
    pub fn set(&self, inputs: impl Into<Inputs>, options: Options) -> Vec<Option<ModelRef>> {
        let plan = Plan::set(&options);
        self.apply(inputs.into(), options, plan)
    }

    /// Remove members addressed by model, key, cid or `{cid}`/`{<main index>}`
    /// object. Non-members yield `None`.
    pub fn remove(&self, queries: impl Into<Queries>, options: Options) -> Vec<Option<ModelRef>> {
        let mut removed = Vec::new();
        for query in queries.into() {
            removed.push(self.remove_one(&query, &options));
        }
        debug!(
            removed = removed.iter().flatten().count(),
            len = self.len(),
            "collection remove"
        );
        removed
    }

    /// Drop every member and repopulate from `inputs`. Emits a single `reset`
    /// carrying the previous members instead of individual add/remove events.
    pub fn reset(&self, inputs: impl Into<Inputs>, options: Options) -> Vec<Option<ModelRef>> {
        let previous = {
            let mut state = self.inner.state.borrow_mut();
            state.index.clear();
            std::mem::take(&mut state.models)
        };
        for model in &previous {
            self.unsubscribe(model);
        }

        let added = self.apply(
            inputs.into(),
            Options {
                silent: Some(true),
                ..options.clone()
            },
            Plan::add(&options),
        );
        debug!(previous = previous.len(), len = self.len(), "collection reset");

        if !options.is_silent() {
            self.emit(CollectionEvent::Reset {
                collection: self.clone(),
                previous,
                options,
            });
        }
        added
    }

    fn apply(&self, inputs: Inputs, options: Options, plan: Plan) -> Vec<Option<ModelRef>> {
        let sortable =
            self.comparator().is_some() && options.at.is_none() && options.sort != Some(false);
        let mut results = Vec::with_capacity(inputs.len());
        let mut kept: HashSet<Cid> = HashSet::new();
        let mut added: Vec<ModelRef> = Vec::new();
        let mut merged = false;
        let mut offset = 0;

        for input in inputs {
            let resolved = self.resolve(input);

            if let Some(existing) = self.existing(&resolved.model) {
                kept.insert(existing.cid());
                if plan.merge && !same_model(&existing, &resolved.model) {
                    if let Some(attributes) = resolved.merge_attributes() {
                        merged |= self.merge_into(&existing, &attributes);
                    }
                }
                results.push(Some(existing));
                continue;
            }

            if !plan.add {
                results.push(None);
                continue;
            }

            let model = resolved.model;
            if options.validates() {
                if let Err(error) = model.validate() {
                    debug!(cid = %model.cid(), %error, "model rejected by validation");
                    self.emit(CollectionEvent::Invalid {
                        collection: self.clone(),
                        error,
                        options: options.clone(),
                    });
                    results.push(None);
                    continue;
                }
            }

            let position = match options.at {
                Some(at) => {
                    let position = at + offset;
                    offset += 1;
                    position
                }
                None if sortable => self.sorted_position(&model),
                None => self.len(),
            };
            self.insert_member(&model, position);
            kept.insert(model.cid());
            added.push(Rc::clone(&model));
            results.push(Some(model));
        }

        let mut removed = 0;
        if plan.remove {
            let stale: Vec<ModelRef> = self
                .models()
                .into_iter()
                .filter(|model| !kept.contains(&model.cid()))
                .collect();
            for model in stale {
                if self.remove_one(&Query::Model(model), &options).is_some() {
                    removed += 1;
                }
            }
        }

        let reorder = sortable && (merged || !added.is_empty());
        if sortable && merged {
            if let Some(comparator) = self.comparator().cloned() {
                self.resort(&comparator);
            }
        }

        debug!(
            added = added.len(),
            removed,
            merged,
            len = self.len(),
            "collection updated"
        );

        if !options.is_silent() {
            for model in added {
                self.emit(CollectionEvent::Add {
                    model,
                    collection: self.clone(),
                    options: options.clone(),
                });
            }
            if reorder {
                self.emit(CollectionEvent::Sort {
                    collection: self.clone(),
                    options,
                });
            }
        }
        results
    }

    /// Merge `attributes` into a member. Observable members reindex through
    /// their change stream; the rest are reindexed here.
    fn merge_into(&self, member: &ModelRef, attributes: &Attributes) -> bool {
        if member.events().is_some() {
            return member.set(attributes);
        }

        let indexes = self.indexes().to_vec();
        let before: Vec<String> = indexes
            .iter()
            .map(|index| IndexStore::key_for(&**member, index))
            .collect();
        let changed = member.set(attributes);
        if changed {
            for (index, old_key) in indexes.iter().zip(before) {
                let new_key = IndexStore::key_for(&**member, index);
                self.reindex_member(member, index, &old_key, &new_key);
            }
        }
        changed
    }

    fn insert_member(&self, model: &ModelRef, position: usize) {
        let displaced = {
            let mut state = self.inner.state.borrow_mut();
            let position = position.min(state.models.len());
            state.models.insert(position, Rc::clone(model));
            state.index.insert(model)
        };
        for (index, other) in displaced {
            debug!(index = %index, cid = %model.cid(), displaced = %other.cid(), "index entry overwritten");
        }
        self.subscribe(model);
    }

    fn remove_one(&self, query: &Query, options: &Options) -> Option<ModelRef> {
        let model = self.lookup(query, None)?;
        let index = self.detach(&model)?;
        if !options.is_silent() {
            self.emit(CollectionEvent::Remove {
                model: Rc::clone(&model),
                collection: self.clone(),
                index,
                options: options.clone(),
            });
        }
        Some(model)
    }

    /// Unlink a member from order, indexes and its change stream.
    /// Returns the position it occupied.
    fn detach(&self, model: &ModelRef) -> Option<usize> {
        let position = {
            let mut state = self.inner.state.borrow_mut();
            let position = state.models.iter().position(|m| same_model(m, model))?;
            state.models.remove(position);
            state.index.drop_all(model);
            position
        };
        self.unsubscribe(model);
        Some(position)
    }

    fn subscribe(&self, model: &ModelRef) {
        let Some(events) = model.events() else {
            return;
        };
        let collection = Rc::downgrade(&self.inner);
        let member = Rc::downgrade(model);
        let id = events.on(ALL, move |event| {
            let (Some(inner), Some(model)) = (collection.upgrade(), member.upgrade()) else {
                return;
            };
            Collection { inner }.on_model_event(&model, event);
        });
        self.inner
            .state
            .borrow_mut()
            .subscriptions
            .insert(model.cid(), id);
    }

    fn unsubscribe(&self, model: &ModelRef) {
        let subscription = self
            .inner
            .state
            .borrow_mut()
            .subscriptions
            .remove(&model.cid());
        if let (Some(id), Some(events)) = (subscription, model.events()) {
            events.off(id);
        }
    }

    fn on_model_event(&self, model: &ModelRef, event: &ModelEvent) {
        // an earlier listener may have removed it during this emit
        if !self.contains(model) {
            return;
        }
        match event {
            ModelEvent::Change {
                attribute,
                previous,
                value,
            } => {
                if self.indexes().iter().any(|index| index == attribute) {
                    let old_key = previous
                        .as_ref()
                        .and_then(index_key)
                        .unwrap_or_else(|| model.cid().to_string());
                    let new_key = IndexStore::key_for(&**model, attribute);
                    self.reindex_member(model, attribute, &old_key, &new_key);
                }
                self.emit(CollectionEvent::Change {
                    model: Rc::clone(model),
                    attribute: Some(attribute.clone()),
                    value: value.clone(),
                });
            }
            ModelEvent::Changed => self.emit(CollectionEvent::Change {
                model: Rc::clone(model),
                attribute: None,
                value: None,
            }),
            ModelEvent::Destroy => {
                self.remove(Query::Model(Rc::clone(model)), Options::new());
            }
        }
    }

    fn reindex_member(&self, model: &ModelRef, index: &str, old_key: &str, new_key: &str) {
        if old_key == new_key {
            return;
        }
        let displaced = self
            .inner
            .state
            .borrow_mut()
            .index
            .reindex(model, index, old_key, new_key);
        trace!(index, old_key, new_key, cid = %model.cid(), "member reindexed");

        if let Some(other) = displaced {
            if index == self.main_index() {
                warn!(
                    index,
                    key = new_key,
                    cid = %model.cid(),
                    displaced = %other.cid(),
                    "main index key collision, last write wins"
                );
            } else {
                debug!(index, key = new_key, displaced = %other.cid(), "index entry overwritten");
            }
        }
    }
}
