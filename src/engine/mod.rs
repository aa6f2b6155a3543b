//! Execution strategies for call-site graphs.
//!
//! All strategies share one contract: given a committed root site and the
//! requesting scope, produce the instance. They differ only in how much work
//! they do up front. Compiled forms are cached per root in a concurrent map;
//! compilation is idempotent, so racing installs are harmless.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::call_site::{CallSiteBuilder, CallSiteGraph, Request, Root, SiteId};
use crate::descriptors::FactoryFn;
use crate::error::DiResult;
use crate::injectable::{erase_trait, AnyArc, Instance};
use crate::options::{ProviderFactory, ProviderOptions, ServiceProviderMode};
use crate::provider::{ResolverContext, ScopeInner};
use crate::registration::Registry;

pub(crate) mod adaptive;
pub(crate) mod expression;
pub(crate) mod interpreter;
pub(crate) mod program;

use adaptive::Adaptive;

/// A compiled root: resolves its graph against a scope.
pub(crate) type Executor = Arc<dyn Fn(&Arc<ScopeInner>) -> DiResult<AnyArc> + Send + Sync>;

static NEXT_ENGINE_ID: AtomicU64 = AtomicU64::new(1);

/// Ahead-of-use compilers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compiler {
    /// Nested closures
    Expression,
    /// Flat register program
    Program,
}

impl Compiler {
    pub(crate) fn compile(self, graph: &CallSiteGraph, root: SiteId) -> Executor {
        match self {
            Compiler::Expression => expression::compile(graph, root),
            Compiler::Program => program::compile(graph, root),
        }
    }
}

pub(crate) enum Strategy {
    Interpreter,
    Compiled(Compiler),
    Adaptive(Adaptive),
}

impl Strategy {
    fn for_mode(mode: ServiceProviderMode, threshold: usize) -> Self {
        match mode {
            ServiceProviderMode::Default | ServiceProviderMode::Runtime => Strategy::Interpreter,
            ServiceProviderMode::Dynamic => Strategy::Adaptive(Adaptive::new(Compiler::Program, threshold)),
            ServiceProviderMode::Expressions => Strategy::Compiled(Compiler::Expression),
            ServiceProviderMode::CodeGen => Strategy::Compiled(Compiler::Program),
        }
    }
}

/// Graph builder, strategy and executor cache shared by every scope of a
/// provider.
pub(crate) struct Engine {
    /// Identifies this provider's scope lineage in the runtime cycle guard
    pub(crate) id: u64,
    pub(crate) mode: ServiceProviderMode,
    pub(crate) validate_scopes: bool,
    pub(crate) provider_factory: Option<ProviderFactory>,
    builder: CallSiteBuilder,
    strategy: Strategy,
    executors: DashMap<SiteId, Executor>,
}

impl Engine {
    pub(crate) fn new(registry: Registry, options: &ProviderOptions) -> Self {
        Self {
            id: NEXT_ENGINE_ID.fetch_add(1, Ordering::Relaxed),
            mode: options.mode,
            validate_scopes: options.validate_scopes,
            provider_factory: options.provider_factory.clone(),
            builder: CallSiteBuilder::new(registry, options.validate_scopes),
            strategy: Strategy::for_mode(options.mode, options.compile_threshold),
            executors: DashMap::new(),
        }
    }

    /// Builds and validates the graph of every registered service.
    pub(crate) fn validate_all(&self) -> DiResult<()> {
        let keys = self.builder.registry().closed_keys();
        tracing::debug!(services = keys.len(), mode = %self.mode, "validating every registration");
        for key in keys {
            self.root(&Request::All(key))?;
        }
        Ok(())
    }

    pub(crate) fn root(&self, request: &Request) -> DiResult<Option<Root>> {
        self.builder.root(request)
    }

    pub(crate) fn graph(&self) -> &CallSiteGraph {
        self.builder.graph()
    }

    pub(crate) fn registration_count(&self) -> usize {
        self.builder.registry().len()
    }

    /// Resolves a committed root in `scope` with the configured strategy.
    pub(crate) fn execute(self: &Arc<Self>, root: SiteId, scope: &Arc<ScopeInner>) -> DiResult<AnyArc> {
        match &self.strategy {
            Strategy::Interpreter => interpreter::resolve(self.graph(), root, scope),
            Strategy::Compiled(compiler) => self.compiled(root, *compiler)(scope),
            Strategy::Adaptive(adaptive) => adaptive.execute(self, root, scope),
        }
    }

    pub(crate) fn cached_executor(&self, root: SiteId) -> Option<Executor> {
        self.executors.get(&root).map(|found| found.value().clone())
    }

    /// The compiled executor of `root`, compiling it on first use.
    pub(crate) fn compiled(&self, root: SiteId, compiler: Compiler) -> Executor {
        if let Some(executor) = self.cached_executor(root) {
            return executor;
        }
        self.install(root, compiler)
    }

    pub(crate) fn install(&self, root: SiteId, compiler: Compiler) -> Executor {
        let executor = compiler.compile(self.graph(), root);
        tracing::trace!(root, ?compiler, "compiled call-site graph");
        self.executors.insert(root, executor.clone());
        executor
    }
}

/// Provider handle as handed to dependents.
pub(crate) fn provider_value(scope: &Arc<ScopeInner>) -> AnyArc {
    erase_trait(scope.provider_handle())
}

/// Scope factory as handed to dependents.
pub(crate) fn scope_factory_value(scope: &Arc<ScopeInner>) -> AnyArc {
    erase_trait(scope.scope_factory())
}

/// Runs a factory delegate against the provider of `owner`.
pub(crate) fn run_factory(factory: &FactoryFn, owner: &Arc<ScopeInner>) -> DiResult<Instance> {
    factory(&ResolverContext::new(owner.provider_handle()))
}
