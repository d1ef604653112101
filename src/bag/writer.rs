use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::value::PropertyValue;
use super::PropertyBag;
use crate::error::{PropertyBagError, Result};

/// Where a writer is in its edit session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    /// Staged values mirror the bag's committed text.
    Reverted,
    /// At least one edit has not been committed.
    Modified,
    /// The writer has been closed; terminal.
    Closed,
}

enum Staged {
    Node(Value),
    Typed(PropertyValue),
}

/// A staged edit session over one bag.
///
/// Holding the writer borrows the bag mutably, so there is at most one
/// writer per bag and nobody reads the bag mid-edit. Dropping a writer with
/// uncommitted edits commits them; use [`close`](Self::close) to observe a
/// commit failure.
pub struct PropertyBagWriter<'a> {
    bag: &'a mut PropertyBag,
    staged: BTreeMap<String, Staged>,
    state: WriterState,
}

impl<'a> PropertyBagWriter<'a> {
    pub(crate) fn new(bag: &'a mut PropertyBag) -> Self {
        let staged = load(bag);
        Self {
            bag,
            staged,
            state: WriterState::Reverted,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Stage `value` under `key`, replacing whatever was staged there.
    pub fn set<T: Serialize + Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.staged
            .insert(key.into(), Staged::Typed(PropertyValue::new(value)));
        self.state = WriterState::Modified;
    }

    /// Stage the removal of `key`. Returns whether anything was staged there.
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.staged.remove(key).is_some();
        if removed {
            self.state = WriterState::Modified;
        }
        removed
    }

    /// Read a staged value.
    ///
    /// A value set as `T` is returned as is. Anything else is converted,
    /// and a failed conversion reads as `None` rather than an error.
    pub fn try_get<T: DeserializeOwned + Clone + 'static>(&self, key: &str) -> Option<T> {
        let options = self.bag.options();
        let converted = match self.staged.get(key)? {
            Staged::Typed(value) => {
                if let Some(typed) = value.downcast_ref::<T>() {
                    return Some(typed.clone());
                }
                value
                    .to_node(options)
                    .and_then(|node| options.from_node::<T>(&node))
            }
            Staged::Node(node) => {
                if let Some(node) = (node as &dyn std::any::Any).downcast_ref::<T>() {
                    return Some(node.clone());
                }
                options.from_node::<T>(node)
            }
        };

        match converted {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!(
                    "Staged property '{}' is not a {}: {}",
                    key,
                    std::any::type_name::<T>(),
                    e
                );
                None
            }
        }
    }

    /// Write every staged value into the bag's text.
    ///
    /// Staged values are kept, so editing can continue. On failure neither
    /// the bag nor the staged values change.
    pub fn commit(&mut self) -> Result<()> {
        let options = Arc::clone(self.bag.options());
        let mut object = Map::new();
        for (key, staged) in &self.staged {
            let node = match staged {
                Staged::Node(node) => node.clone(),
                Staged::Typed(value) => value
                    .to_entry_node(&options)
                    .map_err(|e| PropertyBagError::conversion(key.as_str(), e))?,
            };
            object.insert(key.clone(), node);
        }

        let raw =
            serde_json::to_string(&object).map_err(|e| PropertyBagError::Malformed(e.into()))?;
        log::debug!("Committing {} properties", object.len());
        self.bag.set_raw(raw.into());
        self.state = WriterState::Reverted;
        Ok(())
    }

    /// Drop every staged edit and reload from the bag's committed text.
    pub fn revert(&mut self) {
        self.staged = load(self.bag);
        self.state = WriterState::Reverted;
        log::debug!("Reverted writer to {} committed properties", self.staged.len());
    }

    /// Commit any pending edits and end the session.
    pub fn close(mut self) -> Result<()> {
        let result = match self.state {
            WriterState::Modified => self.commit(),
            _ => Ok(()),
        };
        self.state = WriterState::Closed;
        result
    }
}

impl Drop for PropertyBagWriter<'_> {
    fn drop(&mut self) {
        if self.state == WriterState::Modified {
            if let Err(e) = self.commit() {
                log::error!("Discarding uncommitted property bag edits: {}", e);
            }
        }
        self.state = WriterState::Closed;
    }
}

fn load(bag: &PropertyBag) -> BTreeMap<String, Staged> {
    match bag.to_map() {
        Ok(object) => object
            .into_iter()
            .map(|(key, node)| (key, Staged::Node(node)))
            .collect(),
        Err(e) => {
            log::warn!("Starting writer from an empty bag: {}", e);
            BTreeMap::new()
        }
    }
}
