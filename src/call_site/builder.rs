//! Builds call-site graphs from the registry, one request at a time.

use std::collections::HashMap;

use dashmap::DashMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::validator;
use super::{Argument, CacheKey, CallSite, CallSiteGraph, CallSiteKind, Request, SiteId};
use crate::descriptors::Implementation;
use crate::error::{DiError, DiResult};
use crate::injectable::{Dependency, ErasedConstructor, Fallback, Parameter};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::{Match, Registry};

/// Entry point of a validated graph.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Root {
    pub(crate) site: SiteId,
    /// Scoped service reachable from the root without crossing a cached
    /// singleton or an opaque factory.
    pub(crate) scoped: Option<&'static str>,
}

#[derive(Default)]
struct BuildState {
    singles: HashMap<CacheKey, SiteId>,
    enumerables: HashMap<Request, SiteId>,
    /// Scoped dependency of every committed site, indexed by id
    scoped: Vec<Option<&'static str>>,
}

/// Turns requests into committed call-site graphs.
///
/// Graphs are built in a private session and committed only once the
/// validator accepts them; failed requests leave no trace and fail again the
/// same way when retried.
pub(crate) struct CallSiteBuilder {
    registry: Registry,
    graph: CallSiteGraph,
    validate_scopes: bool,
    roots: DashMap<Request, Option<Root>>,
    state: Mutex<BuildState>,
}

impl CallSiteBuilder {
    pub(crate) fn new(registry: Registry, validate_scopes: bool) -> Self {
        Self {
            registry,
            graph: CallSiteGraph::default(),
            validate_scopes,
            roots: DashMap::new(),
            state: Mutex::new(BuildState::default()),
        }
    }

    pub(crate) fn graph(&self) -> &CallSiteGraph {
        &self.graph
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The validated graph root for `request`, building it on first use.
    ///
    /// `Ok(None)` means nothing is registered for a single request.
    pub(crate) fn root(&self, request: &Request) -> DiResult<Option<Root>> {
        if let Some(found) = self.roots.get(request) {
            return Ok(*found);
        }

        let mut state = self.state.lock();
        if let Some(found) = self.roots.get(request) {
            return Ok(*found);
        }

        let base = self.graph.len();
        let mut session = Session {
            registry: &self.registry,
            state: &*state,
            base,
            pending: Vec::new(),
            singles: HashMap::new(),
            enumerables: HashMap::new(),
            chain: Vec::new(),
        };
        let site = match request {
            Request::One(key) => session.one(key),
            Request::All(_) => session.all(request).map(Some),
        };
        let Session { pending, singles, enumerables, .. } = session;

        let site = site.map_err(|e| {
            tracing::debug!(service = request.key().display_name(), error = %e, "call-site construction failed");
            e
        })?;
        let scoped = validator::validate(&pending, base, &state.scoped, self.validate_scopes)
            .map_err(|e| {
                tracing::debug!(service = request.key().display_name(), error = %e, "call-site validation failed");
                e
            })?;

        let added = pending.len();
        self.graph.append(pending);
        state.scoped.extend(scoped);
        state.singles.extend(singles);
        state.enumerables.extend(enumerables);

        let root = site.map(|site| Root { site, scoped: state.scoped[site] });
        self.roots.insert(request.clone(), root);
        tracing::trace!(service = request.key().display_name(), sites = added, "call-site graph committed");
        Ok(root)
    }
}

/// One build attempt; discarded on failure.
struct Session<'a> {
    registry: &'a Registry,
    state: &'a BuildState,
    base: SiteId,
    pending: Vec<CallSite>,
    singles: HashMap<CacheKey, SiteId>,
    enumerables: HashMap<Request, SiteId>,
    /// Implementations being activated, outermost first
    chain: Vec<&'static str>,
}

impl<'a> Session<'a> {
    /// Reserves an id before the children are built so cycles can point back
    /// at it. The kind is filled in once the children exist.
    fn reserve(&mut self, service: &Key, cache: CacheKey, lifetime: Lifetime) -> SiteId {
        let id = self.base + self.pending.len();
        self.pending.push(CallSite {
            service: service.clone(),
            cache,
            lifetime,
            kind: CallSiteKind::Enumerable { items: Vec::new() },
        });
        id
    }

    fn fill(&mut self, id: SiteId, kind: CallSiteKind) {
        self.pending[id - self.base].kind = kind;
    }

    fn single_site(&self, cache: &CacheKey) -> Option<SiteId> {
        self.singles
            .get(cache)
            .or_else(|| self.state.singles.get(cache))
            .copied()
    }

    fn one(&mut self, key: &Key) -> DiResult<Option<SiteId>> {
        if let Some(kind) = builtin_kind(key) {
            return Ok(Some(self.builtin(key, kind)));
        }
        let registry = self.registry;
        match registry.single(key) {
            Some(found) => self.descriptor(key, found).map(Some),
            None => Ok(None),
        }
    }

    fn builtin(&mut self, key: &Key, kind: CallSiteKind) -> SiteId {
        let cache = CacheKey { key: key.clone(), slot: 0 };
        if let Some(id) = self.single_site(&cache) {
            return id;
        }
        let id = self.reserve(key, cache.clone(), Lifetime::Transient);
        self.fill(id, kind);
        self.singles.insert(cache, id);
        id
    }

    fn all(&mut self, request: &Request) -> DiResult<SiteId> {
        let existing = self
            .enumerables
            .get(request)
            .or_else(|| self.state.enumerables.get(request))
            .copied();
        if let Some(id) = existing {
            return Ok(id);
        }

        let key = request.key();
        let id = self.reserve(key, CacheKey { key: key.clone(), slot: 0 }, Lifetime::Transient);
        self.enumerables.insert(request.clone(), id);

        let mut items = Vec::new();
        if let Some(kind) = builtin_kind(key) {
            items.push(self.builtin(key, kind));
        } else {
            let registry = self.registry;
            for found in registry.matches(key) {
                items.push(self.descriptor(key, found)?);
            }
        }
        self.fill(id, CallSiteKind::Enumerable { items });
        Ok(id)
    }

    fn descriptor(&mut self, key: &Key, found: Match<'a>) -> DiResult<SiteId> {
        let cache = CacheKey { key: key.clone(), slot: found.slot };
        if let Some(id) = self.single_site(&cache) {
            return Ok(id);
        }

        let descriptor = found.descriptor;
        let lifetime = match descriptor.implementation {
            Implementation::Instance(_) => Lifetime::Singleton,
            _ => descriptor.lifetime,
        };
        let id = self.reserve(key, cache.clone(), lifetime);
        self.singles.insert(cache, id);

        let kind = match &descriptor.implementation {
            Implementation::Instance(value) => CallSiteKind::Constant { value: value.clone() },
            Implementation::Factory(factory) => CallSiteKind::Factory { factory: factory.clone() },
            Implementation::Constructors { name, constructors } => self.constructor(*name, constructors)?,
            Implementation::OpenGeneric { .. } => {
                let specializer = key
                    .specializer()
                    .ok_or(DiError::NotFound(key.display_name()))?;
                self.constructor(key.display_name(), &specializer())?
            }
        };
        self.fill(id, kind);
        Ok(id)
    }

    fn constructor(
        &mut self,
        name: &'static str,
        constructors: &[ErasedConstructor],
    ) -> DiResult<CallSiteKind> {
        if constructors.is_empty() {
            return Err(DiError::NoConstructor(name));
        }

        self.chain.push(name);
        let chosen = self.select(name, constructors)?;
        let mut args = Vec::with_capacity(chosen.params.len());
        for param in &chosen.params {
            args.push(self.argument(param)?);
        }
        self.chain.pop();

        Ok(CallSiteKind::Constructor {
            implementation: name,
            invoke: chosen.invoke.clone(),
            args,
        })
    }

    /// Picks the satisfiable constructor with the most parameters.
    fn select<'c>(
        &self,
        name: &'static str,
        constructors: &'c [ErasedConstructor],
    ) -> DiResult<&'c ErasedConstructor> {
        let mut order: SmallVec<[&ErasedConstructor; 4]> = constructors.iter().collect();
        order.sort_by(|a, b| b.params.len().cmp(&a.params.len()));

        let mut best: Option<&ErasedConstructor> = None;
        for &candidate in &order {
            match best {
                Some(chosen) if candidate.params.len() < chosen.params.len() => break,
                Some(_) if self.satisfiable(candidate) => {
                    return Err(DiError::AmbiguousConstructor(name));
                }
                Some(_) => {}
                None if self.satisfiable(candidate) => best = Some(candidate),
                None => {}
            }
        }

        best.ok_or_else(|| {
            let service = order[0]
                .params
                .iter()
                .find(|param| !self.available(param))
                .map(|param| param.key().display_name())
                .unwrap_or(name);
            DiError::Unresolvable { service, chain: self.chain.clone() }
        })
    }

    fn satisfiable(&self, constructor: &ErasedConstructor) -> bool {
        constructor.params.iter().all(|param| self.available(param))
    }

    /// Shallow check: registered, built in, enumerable, or has a fallback.
    fn available(&self, param: &Parameter) -> bool {
        match (&param.dependency, &param.fallback) {
            (Dependency::All(_), _) => true,
            (Dependency::One(_), Fallback::Optional | Fallback::Default(_)) => true,
            (Dependency::One(key), Fallback::Required) => {
                key.is_provider() || key.is_scope_factory() || self.registry.contains(key)
            }
        }
    }

    fn argument(&mut self, param: &Parameter) -> DiResult<Argument> {
        match &param.dependency {
            Dependency::All(key) => {
                let request = Request::All(key.clone());
                self.all(&request).map(Argument::Site)
            }
            Dependency::One(key) => match self.one(key)? {
                Some(id) => Ok(Argument::Site(id)),
                None => match &param.fallback {
                    Fallback::Optional => Ok(Argument::Missing),
                    Fallback::Default(value) => Ok(Argument::Default(value.clone())),
                    Fallback::Required => Err(DiError::Unresolvable {
                        service: key.display_name(),
                        chain: self.chain.clone(),
                    }),
                },
            },
        }
    }
}

/// Services the engine supplies itself, regardless of registrations.
fn builtin_kind(key: &Key) -> Option<CallSiteKind> {
    if key.is_provider() {
        Some(CallSiteKind::ServiceProvider)
    } else if key.is_scope_factory() {
        Some(CallSiteKind::ScopeFactory)
    } else {
        None
    }
}
