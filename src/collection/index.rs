use std::collections::HashMap;
use std::rc::Rc;

use crate::model::{same_model, Cid, Model, ModelRef};
use crate::value::index_key;

/// Named lookup maps from canonical key to member, plus the cid channel.
///
/// Every member has an entry in every configured index: under its attribute
/// value when present, otherwise under its cid. The keys currently recorded
/// for each member are tracked so `drop_all` never scans whole maps.
#[derive(Debug, Default)]
pub(crate) struct IndexStore {
    names: Vec<String>,
    maps: HashMap<String, HashMap<String, ModelRef>>,
    by_cid: HashMap<String, ModelRef>,
    recorded: HashMap<Cid, HashMap<String, String>>,
}

impl IndexStore {
    pub fn new(names: &[String]) -> Self {
        IndexStore {
            names: names.to_vec(),
            maps: names
                .iter()
                .map(|name| (name.clone(), HashMap::new()))
                .collect(),
            by_cid: HashMap::new(),
            recorded: HashMap::new(),
        }
    }

    /// The key `model` belongs under in `index`.
    pub fn key_for(model: &dyn Model, index: &str) -> String {
        model
            .get(index)
            .and_then(|value| index_key(&value))
            .unwrap_or_else(|| model.cid().to_string())
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    pub fn value(&self, index: &str, key: &str) -> Option<ModelRef> {
        self.maps.get(index)?.get(key).cloned()
    }

    pub fn by_cid(&self, cid: &str) -> Option<ModelRef> {
        self.by_cid.get(cid).cloned()
    }

    pub fn contains(&self, model: &ModelRef) -> bool {
        self.by_cid
            .get(&model.cid().to_string())
            .is_some_and(|member| same_model(member, model))
    }

    /// Register `model` under every configured index and its cid.
    /// Returns models whose entries were overwritten (index name, model).
    pub fn insert(&mut self, model: &ModelRef) -> Vec<(String, ModelRef)> {
        let mut displaced = Vec::new();
        let mut keys = HashMap::with_capacity(self.names.len());
        for name in &self.names {
            let key = Self::key_for(&**model, name);
            if let Some(map) = self.maps.get_mut(name) {
                if let Some(previous) = map.insert(key.clone(), Rc::clone(model)) {
                    if !same_model(&previous, model) {
                        displaced.push((name.clone(), previous));
                    }
                }
            }
            keys.insert(name.clone(), key);
        }
        self.by_cid.insert(model.cid().to_string(), Rc::clone(model));
        self.recorded.insert(model.cid(), keys);
        displaced
    }

    /// Move `model` from `old_key` to `new_key` in `index`. The old entry is
    /// only removed if it still points at `model`, and models that were never
    /// inserted (or already dropped) are left out. Returns the model the new
    /// key previously pointed at, if it was a different one.
    pub fn reindex(
        &mut self,
        model: &ModelRef,
        index: &str,
        old_key: &str,
        new_key: &str,
    ) -> Option<ModelRef> {
        let map = self.maps.get_mut(index)?;
        let keys = self.recorded.get_mut(&model.cid())?;
        let recorded = keys.insert(index.to_string(), new_key.to_string());

        for key in [Some(old_key), recorded.as_deref()].into_iter().flatten() {
            if key != new_key && map.get(key).is_some_and(|m| same_model(m, model)) {
                map.remove(key);
            }
        }

        map.insert(new_key.to_string(), Rc::clone(model))
            .filter(|previous| !same_model(previous, model))
    }

    /// Remove every entry pointing at `model`, across all indexes and the cid channel.
    pub fn drop_all(&mut self, model: &ModelRef) {
        if let Some(keys) = self.recorded.remove(&model.cid()) {
            for (index, key) in keys {
                if let Some(map) = self.maps.get_mut(&index) {
                    if map.get(&key).is_some_and(|m| same_model(m, model)) {
                        map.remove(&key);
                    }
                }
            }
        }
        let cid = model.cid().to_string();
        if self.by_cid.get(&cid).is_some_and(|m| same_model(m, model)) {
            self.by_cid.remove(&cid);
        }
    }

    pub fn clear(&mut self) {
        for map in self.maps.values_mut() {
            map.clear();
        }
        self.by_cid.clear();
        self.recorded.clear();
    }

    /// Number of entries in `index`.
    #[cfg(test)]
    pub fn len(&self, index: &str) -> usize {
        self.maps.get(index).map(HashMap::len).unwrap_or(0)
    }
}
