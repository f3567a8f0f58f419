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

//! View compiler
//!
//! Folds an inheritance chain root first, then applies the target view's
//! ordered extension set. Problems with individual patches are recorded in
//! the compile log and never abort the fold.

use crate::cache::Fingerprint;
use crate::error::{EngineError, EngineResult};
use crate::model::{CompileLog, CompiledArtifact, Extension, Node, Patch, ViewContent};
use crate::patch::apply_in_place;
use crate::resolver::InheritanceChain;
use crate::selector::Selector;
use chrono::Utc;
use std::time::Instant;

/// Produces compiled artifacts from resolved inputs
#[derive(Debug, Clone)]
pub struct Compiler {
    record_timings: bool,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// Create a compiler that measures compile durations
    pub fn new() -> Self {
        Self {
            record_timings: true,
        }
    }

    /// Enable or disable duration measurement
    pub fn with_timings(mut self, record_timings: bool) -> Self {
        self.record_timings = record_timings;
        self
    }

    /// Compile `chain` with `extensions` (already filtered and ordered).
    ///
    /// Fails only when the chain root has no tree to start from.
    pub fn compile(
        &self,
        chain: &InheritanceChain,
        extensions: &[Extension],
        fingerprint: Fingerprint,
    ) -> EngineResult<CompiledArtifact> {
        let started = Instant::now();
        let target = chain.target().name.clone();
        log::debug!(
            "compiling '{}' ({} view(s), {} extension(s))",
            target,
            chain.len(),
            extensions.len()
        );

        let root = chain.root();
        let mut tree = match &root.content {
            ViewContent::Tree(tree) => tree.clone(),
            ViewContent::Inherit(_) => return Err(EngineError::missing_base_content(&root.name)),
        };
        let mut compile_log = CompileLog::new();

        for view in &chain.views()[1..] {
            match &view.content {
                ViewContent::Tree(replacement) => {
                    compile_log.info(
                        Some(&view.name),
                        format!("full content replaces the tree inherited from '{}'", root.name),
                    );
                    tree = replacement.clone();
                }
                ViewContent::Inherit(patches) => {
                    for (index, patch) in patches.iter().enumerate() {
                        let label = format!("{}#{}", view.name, index);
                        apply_logged(&mut tree, patch, &label, &mut compile_log);
                    }
                }
            }
        }

        let mut applied_extension_ids = Vec::with_capacity(extensions.len());
        for ext in extensions {
            let label = format!("extension {}", ext.id);
            if apply_logged(&mut tree, &ext.patch, &label, &mut compile_log) {
                applied_extension_ids.push(ext.id);
            }
        }

        let compile_duration_ms = if self.record_timings {
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
        } else {
            0
        };

        log::debug!(
            "compiled '{}': {} extension(s) applied, {} log entr(ies), {}ms",
            target,
            applied_extension_ids.len(),
            compile_log.len(),
            compile_duration_ms
        );

        Ok(CompiledArtifact {
            view_name: target,
            compiled_content: tree,
            input_fingerprint: fingerprint,
            applied_extension_ids,
            compile_log,
            compiled_at: Utc::now(),
            compile_duration_ms,
        })
    }
}

/// Apply one patch, logging instead of failing; returns whether it applied
fn apply_logged(tree: &mut Node, patch: &Patch, label: &str, compile_log: &mut CompileLog) -> bool {
    let selector = match Selector::parse(&patch.selector) {
        Ok(selector) => selector,
        Err(err) => {
            log::error!("{label}: invalid selector '{}': {err}", patch.selector);
            compile_log.error(
                Some(label),
                format!("invalid selector '{}': {err}", patch.selector),
            );
            return false;
        }
    };

    let Some(at) = selector.select_first(tree) else {
        log::warn!("{label}: selector '{}' matched no node", patch.selector);
        compile_log.warning(
            Some(label),
            format!("selector '{}' matched no node", patch.selector),
        );
        return false;
    };

    match apply_in_place(tree, &at, patch) {
        Ok(()) => true,
        Err(err) => {
            log::error!("{label}: {} at {at} skipped: {err}", patch.operation);
            compile_log.error(
                Some(label),
                format!("{} at {at} skipped: {err}", patch.operation),
            );
            false
        }
    }
}
