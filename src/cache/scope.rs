//! Plugin scope to compiled view index

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Default)]
struct ScopeMaps {
    by_scope: FxHashMap<String, FxHashSet<String>>,
    by_view: FxHashMap<String, FxHashSet<String>>,
}

impl ScopeMaps {
    fn unlink_view(&mut self, view: &str) -> Option<FxHashSet<String>> {
        let scopes = self.by_view.remove(view)?;
        for scope in &scopes {
            if let Some(views) = self.by_scope.get_mut(scope) {
                views.remove(view);
                if views.is_empty() {
                    self.by_scope.remove(scope);
                }
            }
        }
        Some(scopes)
    }
}

/// Which cached views each plugin scope contributed to.
///
/// Kept in both directions so that re-recording a view drops its stale
/// scope memberships without scanning.
#[derive(Debug, Default)]
pub struct ScopeIndex {
    maps: RwLock<ScopeMaps>,
}

impl ScopeIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the recorded scopes of `view`
    pub fn record<I, S>(&self, view: &str, scopes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: FxHashSet<String> = scopes.into_iter().map(Into::into).collect();
        let mut maps = self.maps.write();
        maps.unlink_view(view);
        if scopes.is_empty() {
            return;
        }
        for scope in &scopes {
            maps.by_scope
                .entry(scope.clone())
                .or_default()
                .insert(view.to_string());
        }
        maps.by_view.insert(view.to_string(), scopes);
    }

    /// Drop everything recorded for one view
    pub fn forget_view(&self, view: &str) {
        self.maps.write().unlink_view(view);
    }

    /// Drop everything
    pub fn clear(&self) {
        let mut maps = self.maps.write();
        maps.by_scope.clear();
        maps.by_view.clear();
    }

    /// Views currently linked to a scope, sorted
    pub fn views_in(&self, scope: &str) -> Vec<String> {
        let maps = self.maps.read();
        let mut views: Vec<String> = maps
            .by_scope
            .get(scope)
            .map(|views| views.iter().cloned().collect())
            .unwrap_or_default();
        views.sort();
        views
    }

    /// Scopes currently recorded for a view, sorted
    pub fn scopes_of(&self, view: &str) -> Vec<String> {
        let maps = self.maps.read();
        let mut scopes: Vec<String> = maps
            .by_view
            .get(view)
            .map(|scopes| scopes.iter().cloned().collect())
            .unwrap_or_default();
        scopes.sort();
        scopes
    }
}
