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

//! Compiled artifact persistence

use crate::error::StoreError;
use crate::model::CompiledArtifact;
use dashmap::DashMap;

/// Storage for compiled artifacts, one row per view name
pub trait ArtifactStore: Send + Sync {
    /// Load the artifact stored for a view.
    ///
    /// An unreadable row is reported as [`StoreError::Corrupted`].
    fn load(&self, view_name: &str) -> Result<Option<CompiledArtifact>, StoreError>;

    /// Store an artifact, superseding any previous row for the same view
    fn upsert(&self, artifact: &CompiledArtifact) -> Result<(), StoreError>;

    /// Delete the row of one view; returns whether a row existed
    fn delete(&self, view_name: &str) -> Result<bool, StoreError>;

    /// Delete every row; returns the number removed
    fn clear(&self) -> Result<usize, StoreError>;
}

/// In-process artifact store keeping rows as serialized JSON
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    rows: DashMap<String, Vec<u8>>,
}

impl MemoryArtifactStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a row with arbitrary bytes
    pub fn insert_raw(&self, view_name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.rows.insert(view_name.into(), bytes.into());
    }

    /// Whether a row exists for a view
    pub fn contains(&self, view_name: &str) -> bool {
        self.rows.contains_key(view_name)
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn load(&self, view_name: &str) -> Result<Option<CompiledArtifact>, StoreError> {
        let Some(row) = self.rows.get(view_name) else {
            return Ok(None);
        };
        serde_json::from_slice(row.value())
            .map(Some)
            .map_err(|err| StoreError::corrupted(view_name, err.to_string()))
    }

    fn upsert(&self, artifact: &CompiledArtifact) -> Result<(), StoreError> {
        let row = serde_json::to_vec(artifact).map_err(|err| StoreError::Backend(err.to_string()))?;
        self.rows.insert(artifact.view_name.clone(), row);
        Ok(())
    }

    fn delete(&self, view_name: &str) -> Result<bool, StoreError> {
        Ok(self.rows.remove(view_name).is_some())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let count = self.rows.len();
        self.rows.clear();
        Ok(count)
    }
}
