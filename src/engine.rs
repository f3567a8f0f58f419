//! View composition engine - the main entry point for compiling views

use crate::cache::{
    ArtifactStore, CacheConfig, CacheCounters, CacheStats, CompileLocks, Fingerprint,
    MemoryArtifactStore, ScopeIndex, fingerprint,
};
use crate::compiler::Compiler;
use crate::error::{EngineResult, StoreError, ValidationError};
use crate::model::{CompiledArtifact, Context, Extension, ViewSource};
use crate::resolver::{ChainMemo, InheritanceChain, resolve_active};
use crate::store::SourceProvider;
use crate::validation;
use std::sync::Arc;

/// Inputs of one compilation, resolved from current sources
struct ResolvedInputs {
    chain: InheritanceChain,
    extensions: Vec<Extension>,
    fingerprint: Fingerprint,
}

impl ResolvedInputs {
    fn scopes(&self) -> Vec<String> {
        self.chain
            .scopes()
            .chain(
                self.extensions
                    .iter()
                    .filter_map(|ext| ext.plugin_scope.as_deref()),
            )
            .map(str::to_string)
            .collect()
    }
}

/// Compiles views against their sources and caches the results
pub struct ViewEngine {
    sources: Arc<dyn SourceProvider>,
    artifacts: Arc<dyn ArtifactStore>,
    config: CacheConfig,
    compiler: Compiler,
    chains: ChainMemo,
    scopes: ScopeIndex,
    locks: CompileLocks,
    counters: CacheCounters,
}

impl ViewEngine {
    /// Create an engine over `sources` with an in-memory artifact store
    pub fn new(sources: Arc<dyn SourceProvider>) -> Self {
        Self::with_store(sources, Arc::new(MemoryArtifactStore::new()))
    }

    /// Create an engine persisting artifacts in `artifacts`
    pub fn with_store(sources: Arc<dyn SourceProvider>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        let config = CacheConfig::default();
        Self {
            sources,
            artifacts,
            compiler: Compiler::new().with_timings(config.record_timings),
            chains: ChainMemo::new(config.chain_memo_size, config.max_inheritance_depth),
            scopes: ScopeIndex::new(),
            locks: CompileLocks::new(),
            counters: CacheCounters::default(),
            config,
        }
    }

    /// Replace the cache configuration; drops memoized chains
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.compiler = Compiler::new().with_timings(config.record_timings);
        self.chains = ChainMemo::new(config.chain_memo_size, config.max_inheritance_depth);
        self.config = config;
        self
    }

    /// Active cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Compile a view for rendering, reusing a cached artifact when current.
    ///
    /// Only a missing view, an inheritance cycle, a chain without base
    /// content, or a source-store failure is returned as an error; patch
    /// problems end up in the artifact's compile log.
    pub fn compile(&self, view_name: &str, context: &Context) -> EngineResult<CompiledArtifact> {
        self.get_or_compile(view_name, context)
    }

    /// Return the stored artifact if its fingerprint matches current inputs,
    /// otherwise compile and store a fresh one.
    ///
    /// Concurrent callers missing on the same `(view, fingerprint)` compile
    /// once; the others reuse the stored result.
    pub fn get_or_compile(
        &self,
        view_name: &str,
        context: &Context,
    ) -> EngineResult<CompiledArtifact> {
        let inputs = self.resolve_inputs(view_name, context)?;

        if !self.config.enable_artifact_caching {
            self.counters.miss();
            return self.run_compiler(&inputs);
        }

        // Rows written by an earlier process are only known to the index once
        // they are read, so hits record their scopes as well.
        if let Some(artifact) = self.lookup(view_name, inputs.fingerprint) {
            log::debug!(
                "cache hit for '{}' ({})",
                view_name,
                inputs.fingerprint.short()
            );
            self.counters.hit();
            self.scopes.record(view_name, inputs.scopes());
            return Ok(artifact);
        }
        log::debug!(
            "cache miss for '{}' ({})",
            view_name,
            inputs.fingerprint.short()
        );
        self.counters.miss();

        self.locks.run_exclusive(view_name, inputs.fingerprint, || {
            if let Some(artifact) = self.lookup(view_name, inputs.fingerprint) {
                log::debug!("'{view_name}' was compiled by a concurrent caller");
                self.scopes.record(view_name, inputs.scopes());
                return Ok(artifact);
            }

            let artifact = self.run_compiler(&inputs)?;
            if let Err(err) = self.artifacts.upsert(&artifact) {
                log::warn!("could not store artifact for '{view_name}': {err}");
            }
            self.scopes.record(view_name, inputs.scopes());
            Ok(artifact)
        })
    }

    /// Compile without reading or writing the artifact store
    pub fn compile_uncached(
        &self,
        view_name: &str,
        context: &Context,
    ) -> EngineResult<CompiledArtifact> {
        let inputs = self.resolve_inputs(view_name, context)?;
        self.run_compiler(&inputs)
    }

    /// Fingerprint of the current inputs of a view
    pub fn fingerprint(&self, view_name: &str, context: &Context) -> EngineResult<Fingerprint> {
        Ok(self.resolve_inputs(view_name, context)?.fingerprint)
    }

    /// Delete the cached artifact of one view; returns whether one existed
    pub fn invalidate(&self, view_name: &str) -> EngineResult<bool> {
        let removed = self.artifacts.delete(view_name)?;
        self.scopes.forget_view(view_name);
        self.chains.forget(view_name);
        log::info!("invalidated '{view_name}' (artifact removed: {removed})");
        Ok(removed)
    }

    /// Delete the cached artifacts of every view a plugin scope contributed
    /// to; returns those view names
    ///
    /// Every view is attempted. A view whose row could not be deleted stays
    /// indexed under the scope so a later call retries it, and the first
    /// such error is returned once all views were tried.
    pub fn invalidate_by_scope(&self, plugin_scope: &str) -> EngineResult<Vec<String>> {
        let mut invalidated = Vec::new();
        let mut first_error = None;

        for view in self.scopes.views_in(plugin_scope) {
            match self.artifacts.delete(&view) {
                Ok(_) => {
                    self.scopes.forget_view(&view);
                    self.chains.forget(&view);
                    invalidated.push(view);
                }
                Err(err) => {
                    log::warn!("could not invalidate '{view}' in scope '{plugin_scope}': {err}");
                    first_error.get_or_insert(err);
                }
            }
        }

        log::info!(
            "invalidated scope '{}': {} view(s)",
            plugin_scope,
            invalidated.len()
        );
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(invalidated),
        }
    }

    /// Delete every cached artifact; returns the number removed
    pub fn invalidate_all(&self) -> EngineResult<usize> {
        let removed = self.artifacts.clear()?;
        self.scopes.clear();
        self.chains.forget_all();
        log::info!("invalidated all artifacts ({removed} removed)");
        Ok(removed)
    }

    /// Write-time checks for an extension
    pub fn validate_extension(&self, extension: &Extension) -> Vec<ValidationError> {
        validation::validate_extension(extension)
    }

    /// Write-time checks for a view source
    pub fn validate_view(&self, view: &ViewSource) -> Vec<ValidationError> {
        validation::validate_view(view)
    }

    /// Views a plugin scope currently has cached contributions in
    pub fn views_in_scope(&self, plugin_scope: &str) -> Vec<String> {
        self.scopes.views_in(plugin_scope)
    }

    /// Cache statistics snapshot
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Reset cache statistics
    pub fn reset_stats(&self) {
        self.counters.reset();
    }

    fn resolve_inputs(&self, view_name: &str, context: &Context) -> EngineResult<ResolvedInputs> {
        let chain = self.chains.resolve(self.sources.as_ref(), view_name)?;
        let extensions = resolve_active(self.sources.as_ref(), view_name, context)?;
        let fingerprint = fingerprint(&chain, &extensions)?;
        Ok(ResolvedInputs {
            chain,
            extensions,
            fingerprint,
        })
    }

    fn run_compiler(&self, inputs: &ResolvedInputs) -> EngineResult<CompiledArtifact> {
        let artifact = self
            .compiler
            .compile(&inputs.chain, &inputs.extensions, inputs.fingerprint)?;
        self.counters.compiled();
        Ok(artifact)
    }

    /// Stored artifact for `view_name` if it was compiled from `expected`.
    ///
    /// Unreadable rows and backend failures count as a miss.
    fn lookup(&self, view_name: &str, expected: Fingerprint) -> Option<CompiledArtifact> {
        match self.artifacts.load(view_name) {
            Ok(Some(artifact)) if artifact.input_fingerprint == expected => Some(artifact),
            Ok(Some(artifact)) => {
                log::debug!(
                    "artifact for '{}' is stale ({} != {})",
                    view_name,
                    artifact.input_fingerprint.short(),
                    expected.short()
                );
                None
            }
            Ok(None) => None,
            Err(err @ StoreError::Corrupted { .. }) => {
                log::warn!("{err}; recompiling");
                self.counters.corrupted();
                None
            }
            Err(err) => {
                log::warn!("artifact store failed for '{view_name}': {err}; recompiling");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, Operation};
    use crate::store::MemorySourceStore;

    fn engine() -> (Arc<MemorySourceStore>, ViewEngine) {
        let store = Arc::new(MemorySourceStore::new());
        store.put_view(ViewSource::root(
            "form",
            Node::group("root", vec![Node::field("a")]),
        ));
        let engine = ViewEngine::new(store.clone()).with_config(CacheConfig::testing());
        (store, engine)
    }

    #[test]
    fn test_second_compile_is_a_hit() {
        let (_, engine) = engine();
        let ctx = Context::new();
        let first = engine.compile("form", &ctx).unwrap();
        let second = engine.compile("form", &ctx).unwrap();

        assert_eq!(first, second);
        let stats = engine.stats();
        assert_eq!((stats.hits, stats.misses, stats.compiles), (1, 1, 1));
    }

    #[test]
    fn test_new_extension_changes_fingerprint() {
        let (store, engine) = engine();
        let ctx = Context::new();
        let before = engine.fingerprint("form", &ctx).unwrap();

        store.insert_extension(
            Extension::new(0, "form", "field[name=a]", Operation::After)
                .with_payload(vec![Node::field("b")]),
        );
        assert_ne!(before, engine.fingerprint("form", &ctx).unwrap());

        let artifact = engine.compile("form", &ctx).unwrap();
        assert_eq!(artifact.compiled_content.node_count(), 3);
    }

    #[test]
    fn test_disabled_caching_always_compiles() {
        let (_, engine) = engine();
        let engine = engine.with_config(CacheConfig::disabled());
        let ctx = Context::new();
        engine.compile("form", &ctx).unwrap();
        engine.compile("form", &ctx).unwrap();
        assert_eq!(engine.stats().compiles, 2);
        assert_eq!(engine.stats().hits, 0);
    }

    #[test]
    fn test_invalidate_forces_recompile() {
        let (_, engine) = engine();
        let ctx = Context::new();
        engine.compile("form", &ctx).unwrap();
        assert!(engine.invalidate("form").unwrap());
        assert!(!engine.invalidate("form").unwrap());

        engine.compile("form", &ctx).unwrap();
        assert_eq!(engine.stats().compiles, 2);
        assert_eq!(engine.invalidate_all().unwrap(), 1);
    }
}
