// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Source record access
//!
//! The engine reads view sources and extensions through [`SourceProvider`];
//! persistence technology is the host's business. [`MemorySourceStore`] is
//! the in-process implementation used by the CLI and the tests.

use crate::error::{StoreError, ValidationError};
use crate::model::{Extension, ViewSource};
use crate::validation::validate_extension;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Read access to view sources and extensions
pub trait SourceProvider: Send + Sync {
    /// Fetch a view source by name, active or not
    fn view(&self, name: &str) -> Result<Option<ViewSource>, StoreError>;

    /// Fetch several view sources at once, one slot per requested name.
    ///
    /// Backends with batched reads should override this.
    fn views(&self, names: &[String]) -> Result<Vec<Option<ViewSource>>, StoreError> {
        names.iter().map(|name| self.view(name)).collect()
    }

    /// Fetch the active extensions targeting `target`, in any order
    fn active_extensions(&self, target: &str) -> Result<Vec<Extension>, StoreError>;
}

/// Serializable set of source records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceBundle {
    /// View sources
    #[serde(default)]
    pub views: Vec<ViewSource>,
    /// Extensions
    #[serde(default)]
    pub extensions: Vec<Extension>,
}

/// Thread-safe in-memory source store
#[derive(Debug)]
pub struct MemorySourceStore {
    views: RwLock<FxHashMap<String, ViewSource>>,
    extensions: RwLock<Vec<Extension>>,
    next_id: AtomicU64,
}

impl MemorySourceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            views: RwLock::new(FxHashMap::default()),
            extensions: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a store holding every record of a bundle.
    ///
    /// Extension ids from the bundle are kept; later insertions continue
    /// after the highest one.
    pub fn from_bundle(bundle: SourceBundle) -> Self {
        let store = Self::new();
        for view in bundle.views {
            store.put_view(view);
        }
        let max_id = bundle.extensions.iter().map(|ext| ext.id).max().unwrap_or(0);
        store.next_id.store(max_id + 1, Ordering::SeqCst);
        store.extensions.write().extend(bundle.extensions);
        store
    }

    /// Insert or replace a view source
    pub fn put_view(&self, view: ViewSource) {
        self.views.write().insert(view.name.clone(), view);
    }

    /// Remove a view source
    pub fn remove_view(&self, name: &str) -> Option<ViewSource> {
        self.views.write().remove(name)
    }

    /// Edit a stored view in place; returns `false` if it does not exist
    pub fn update_view<F>(&self, name: &str, edit: F) -> bool
    where
        F: FnOnce(&mut ViewSource),
    {
        match self.views.write().get_mut(name) {
            Some(view) => {
                edit(view);
                true
            }
            None => false,
        }
    }

    /// Store an extension under a fresh insertion id, without validation
    pub fn insert_extension(&self, mut extension: Extension) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        extension.id = id;
        self.extensions.write().push(extension);
        id
    }

    /// Validate and store an extension.
    ///
    /// An extension with validation errors is still stored, but inactive.
    pub fn submit_extension(&self, mut extension: Extension) -> (u64, Vec<ValidationError>) {
        let errors = validate_extension(&extension);
        if !errors.is_empty() {
            log::warn!(
                "extension targeting '{}' stored inactive: {} validation error(s)",
                extension.target_name,
                errors.len()
            );
            extension.active = false;
        }
        (self.insert_extension(extension), errors)
    }

    /// Edit a stored extension in place; returns `false` if it does not exist
    pub fn update_extension<F>(&self, id: u64, edit: F) -> bool
    where
        F: FnOnce(&mut Extension),
    {
        match self.extensions.write().iter_mut().find(|ext| ext.id == id) {
            Some(extension) => {
                edit(extension);
                true
            }
            None => false,
        }
    }

    /// Remove an extension by id
    pub fn remove_extension(&self, id: u64) -> Option<Extension> {
        let mut extensions = self.extensions.write();
        let index = extensions.iter().position(|ext| ext.id == id)?;
        Some(extensions.remove(index))
    }

    /// Snapshot of all records
    pub fn to_bundle(&self) -> SourceBundle {
        let mut views: Vec<ViewSource> = self.views.read().values().cloned().collect();
        views.sort_by(|a, b| a.name.cmp(&b.name));
        SourceBundle {
            views,
            extensions: self.extensions.read().clone(),
        }
    }
}

impl Default for MemorySourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceProvider for MemorySourceStore {
    fn view(&self, name: &str) -> Result<Option<ViewSource>, StoreError> {
        Ok(self.views.read().get(name).cloned())
    }

    fn views(&self, names: &[String]) -> Result<Vec<Option<ViewSource>>, StoreError> {
        let views = self.views.read();
        Ok(names.iter().map(|name| views.get(name).cloned()).collect())
    }

    fn active_extensions(&self, target: &str) -> Result<Vec<Extension>, StoreError> {
        Ok(self
            .extensions
            .read()
            .iter()
            .filter(|ext| ext.active && ext.target_name == target)
            .cloned()
            .collect())
    }
}
