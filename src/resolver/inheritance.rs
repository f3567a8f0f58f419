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

//! Inheritance chain resolution

use crate::error::{EngineError, EngineResult};
use crate::model::ViewSource;
use crate::store::SourceProvider;
use lru::LruCache;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use std::num::NonZeroUsize;

/// Views from the root of an inheritance chain down to the requested view
#[derive(Debug, Clone, PartialEq)]
pub struct InheritanceChain {
    views: Vec<ViewSource>,
}

impl InheritanceChain {
    /// Views root first
    pub fn views(&self) -> &[ViewSource] {
        &self.views
    }

    /// The root (parentless) view
    pub fn root(&self) -> &ViewSource {
        &self.views[0]
    }

    /// The requested view
    pub fn target(&self) -> &ViewSource {
        &self.views[self.views.len() - 1]
    }

    /// View names root first
    pub fn names(&self) -> Vec<String> {
        self.views.iter().map(|view| view.name.clone()).collect()
    }

    /// Plugin scopes of every view in the chain
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.views
            .iter()
            .filter_map(|view| view.plugin_scope.as_deref())
    }

    /// Number of views in the chain
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Always `false`; a chain holds at least the requested view
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

fn fetch_active(provider: &dyn SourceProvider, name: &str) -> EngineResult<ViewSource> {
    provider
        .view(name)?
        .filter(|view| view.active)
        .ok_or_else(|| EngineError::view_not_found(name))
}

/// Walk parent links from `name` to the root.
///
/// A revisited name fails with [`EngineError::CircularInheritance`] listing
/// the cycle, however long the cycle is. Acyclic chains longer than
/// `max_depth` fail with [`EngineError::InheritanceTooDeep`]. The walk always
/// terminates: every step visits a record not seen before.
pub fn resolve_chain(
    provider: &dyn SourceProvider,
    name: &str,
    max_depth: usize,
) -> EngineResult<InheritanceChain> {
    let mut visited: FxHashSet<String> = FxHashSet::default();
    let mut order: Vec<String> = Vec::new();
    let mut views: Vec<ViewSource> = Vec::new();
    let mut current = name.to_string();

    loop {
        if visited.contains(&current) {
            let start = order.iter().position(|n| *n == current).unwrap_or(0);
            let mut cycle = order[start..].to_vec();
            cycle.push(current);
            return Err(EngineError::CircularInheritance { cycle });
        }

        let view = fetch_active(provider, &current)?;
        visited.insert(current.clone());
        order.push(current);

        let parent = view.parent_name.clone();
        views.push(view);
        match parent {
            Some(parent) => current = parent,
            None => break,
        }
    }

    if views.len() > max_depth {
        return Err(EngineError::InheritanceTooDeep {
            view: name.to_string(),
            limit: max_depth,
        });
    }

    views.reverse();
    Ok(InheritanceChain { views })
}

/// Memoized chain resolution.
///
/// Stores the resolved name sequence per view. A cold walk has to fetch one
/// record at a time, since each parent is only known once its child is
/// loaded. With a memoized sequence every link is fetched in one
/// [`SourceProvider::views`] call instead. Fingerprints need every link's
/// current content, so the records themselves are always re-read. The links
/// are re-checked against them, and a stale memo falls back to a full walk
/// instead of producing a wrong chain.
pub struct ChainMemo {
    chains: Option<Mutex<LruCache<String, Vec<String>>>>,
    max_depth: usize,
}

impl ChainMemo {
    /// Create a memo holding up to `capacity` chains; `0` disables memoization
    pub fn new(capacity: usize, max_depth: usize) -> Self {
        Self {
            chains: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            max_depth,
        }
    }

    /// Resolve the chain for `name`, reusing a memoized walk when still valid
    pub fn resolve(
        &self,
        provider: &dyn SourceProvider,
        name: &str,
    ) -> EngineResult<InheritanceChain> {
        let Some(chains) = &self.chains else {
            return resolve_chain(provider, name, self.max_depth);
        };

        let memoized = chains.lock().get(name).cloned();
        if let Some(names) = memoized {
            if let Some(chain) = Self::revalidate(provider, &names)? {
                log::trace!("reusing memoized chain for '{name}'");
                return Ok(chain);
            }
            log::debug!("memoized chain for '{name}' is stale; walking again");
        }

        let chain = resolve_chain(provider, name, self.max_depth)?;
        chains.lock().put(name.to_string(), chain.names());
        Ok(chain)
    }

    fn revalidate(
        provider: &dyn SourceProvider,
        names: &[String],
    ) -> EngineResult<Option<InheritanceChain>> {
        let fetched = provider.views(names)?;
        if fetched.len() != names.len() {
            return Ok(None);
        }

        let mut views = Vec::with_capacity(names.len());
        let mut expected_parent: Option<&str> = None;

        for (name, view) in names.iter().zip(fetched) {
            let Some(view) = view.filter(|view| view.active && view.name == *name) else {
                return Ok(None);
            };
            if view.parent_name.as_deref() != expected_parent {
                return Ok(None);
            }
            expected_parent = Some(name.as_str());
            views.push(view);
        }

        Ok((!views.is_empty()).then_some(InheritanceChain { views }))
    }

    /// Drop the memoized chain of one view
    pub fn forget(&self, name: &str) {
        if let Some(chains) = &self.chains {
            chains.lock().pop(name);
        }
    }

    /// Drop every memoized chain
    pub fn forget_all(&self) {
        if let Some(chains) = &self.chains {
            chains.lock().clear();
        }
    }

    /// Number of memoized chains
    pub fn len(&self) -> usize {
        self.chains.as_ref().map_or(0, |chains| chains.lock().len())
    }

    /// Whether nothing is memoized
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::{Extension, Node, Operation, Patch};
    use crate::store::MemorySourceStore;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store_with_chain() -> MemorySourceStore {
        let store = MemorySourceStore::new();
        store.put_view(ViewSource::root("base", Node::group("root", vec![])));
        store.put_view(ViewSource::inheriting("mid", "base", vec![]));
        store.put_view(ViewSource::inheriting(
            "leaf",
            "mid",
            vec![Patch::new("group", Operation::Remove)],
        ));
        store
    }

    #[test]
    fn test_root_first_order() {
        let store = store_with_chain();
        let chain = resolve_chain(&store, "leaf", 32).unwrap();
        assert_eq!(chain.names(), vec!["base", "mid", "leaf"]);
        assert_eq!(chain.root().name, "base");
        assert_eq!(chain.target().name, "leaf");
    }

    #[test]
    fn test_cycle_is_reported_with_members() {
        let store = MemorySourceStore::new();
        store.put_view(ViewSource::inheriting("a", "b", vec![]));
        store.put_view(ViewSource::inheriting("b", "c", vec![]));
        store.put_view(ViewSource::inheriting("c", "a", vec![]));

        assert_eq!(
            resolve_chain(&store, "a", 32),
            Err(EngineError::CircularInheritance {
                cycle: vec!["a".into(), "b".into(), "c".into(), "a".into()]
            })
        );
    }

    #[test]
    fn test_cycle_below_entry_point() {
        let store = MemorySourceStore::new();
        store.put_view(ViewSource::inheriting("entry", "x", vec![]));
        store.put_view(ViewSource::inheriting("x", "y", vec![]));
        store.put_view(ViewSource::inheriting("y", "x", vec![]));

        assert_eq!(
            resolve_chain(&store, "entry", 32),
            Err(EngineError::CircularInheritance {
                cycle: vec!["x".into(), "y".into(), "x".into()]
            })
        );
    }

    #[test]
    fn test_missing_and_inactive_parents() {
        let store = store_with_chain();
        store.update_view("mid", |view| view.active = false);
        assert_eq!(
            resolve_chain(&store, "leaf", 32),
            Err(EngineError::view_not_found("mid"))
        );
        assert_eq!(
            resolve_chain(&store, "nope", 32),
            Err(EngineError::view_not_found("nope"))
        );
    }

    #[test]
    fn test_depth_limit() {
        let store = store_with_chain();
        assert_eq!(
            resolve_chain(&store, "leaf", 2),
            Err(EngineError::InheritanceTooDeep {
                view: "leaf".to_string(),
                limit: 2
            })
        );
    }

    fn ring(store: &MemorySourceStore, size: usize) {
        for i in 0..size {
            store.put_view(ViewSource::inheriting(
                format!("v{i}"),
                format!("v{}", (i + 1) % size),
                vec![],
            ));
        }
    }

    #[rstest]
    #[case(10, 8)]
    #[case(40, 32)]
    fn test_cycle_longer_than_depth_limit(#[case] size: usize, #[case] limit: usize) {
        let store = MemorySourceStore::new();
        ring(&store, size);

        let mut cycle: Vec<String> = (0..size).map(|i| format!("v{i}")).collect();
        cycle.push("v0".to_string());
        assert_eq!(
            resolve_chain(&store, "v0", limit),
            Err(EngineError::CircularInheritance { cycle })
        );
    }

    #[test]
    fn test_long_acyclic_prefix_before_cycle() {
        let store = MemorySourceStore::new();
        ring(&store, 3);
        store.put_view(ViewSource::inheriting("entry", "v0", vec![]));

        assert!(matches!(
            resolve_chain(&store, "entry", 2),
            Err(EngineError::CircularInheritance { .. })
        ));
    }

    /// Counts single and batched record reads
    struct CountingProvider {
        inner: MemorySourceStore,
        single: AtomicUsize,
        batched: AtomicUsize,
    }

    impl SourceProvider for CountingProvider {
        fn view(&self, name: &str) -> Result<Option<ViewSource>, StoreError> {
            self.single.fetch_add(1, Ordering::SeqCst);
            self.inner.view(name)
        }

        fn views(&self, names: &[String]) -> Result<Vec<Option<ViewSource>>, StoreError> {
            self.batched.fetch_add(1, Ordering::SeqCst);
            self.inner.views(names)
        }

        fn active_extensions(&self, target: &str) -> Result<Vec<Extension>, StoreError> {
            self.inner.active_extensions(target)
        }
    }

    #[test]
    fn test_memo_fetches_known_chain_in_one_batch() {
        let provider = CountingProvider {
            inner: store_with_chain(),
            single: AtomicUsize::new(0),
            batched: AtomicUsize::new(0),
        };
        let memo = ChainMemo::new(8, 32);

        memo.resolve(&provider, "leaf").unwrap();
        assert_eq!(provider.single.load(Ordering::SeqCst), 3);
        assert_eq!(provider.batched.load(Ordering::SeqCst), 0);

        let chain = memo.resolve(&provider, "leaf").unwrap();
        assert_eq!(chain.names(), vec!["base", "mid", "leaf"]);
        assert_eq!(provider.single.load(Ordering::SeqCst), 3);
        assert_eq!(provider.batched.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_memo_revalidates_links() {
        let store = store_with_chain();
        let memo = ChainMemo::new(8, 32);

        assert_eq!(memo.resolve(&store, "leaf").unwrap().len(), 3);
        assert_eq!(memo.len(), 1);

        store.update_view("leaf", |view| view.parent_name = Some("base".to_string()));
        assert_eq!(memo.resolve(&store, "leaf").unwrap().names(), vec!["base", "leaf"]);

        memo.forget("leaf");
        assert!(memo.is_empty());
    }

    #[test]
    fn test_memo_disabled() {
        let store = store_with_chain();
        let memo = ChainMemo::new(0, 32);
        assert_eq!(memo.resolve(&store, "leaf").unwrap().len(), 3);
        assert!(memo.is_empty());
    }
}
