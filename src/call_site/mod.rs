//! Call-site graph: the resolved recipe for producing a service.
//!
//! Each node describes one step (invoke a constructor, run a factory, collect
//! an enumerable, hand out the provider) together with the lifetime and cache
//! key governing its result. Nodes live in an append-only arena and reference
//! each other by [`SiteId`], so the graph may describe cycles; the validator
//! rejects those before anything is committed.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::descriptors::FactoryFn;
use crate::injectable::{AnyArc, InvokeFn};
use crate::key::Key;
use crate::lifetime::Lifetime;

pub(crate) mod builder;
pub(crate) mod validator;

pub(crate) use builder::{CallSiteBuilder, Root};

/// Index of a node in the [`CallSiteGraph`].
pub(crate) type SiteId = usize;

/// Identity of a cached instance: the service and the registration slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub(crate) key: Key,
    pub(crate) slot: usize,
}

/// A resolution request as issued by the façade.
#[derive(Debug, Clone)]
pub(crate) enum Request {
    One(Key),
    All(Key),
}

impl Request {
    pub(crate) fn key(&self) -> &Key {
        match self {
            Request::One(key) | Request::All(key) => key,
        }
    }

    fn discriminant(&self) -> (bool, bool) {
        (matches!(self, Request::All(_)), self.key().specializer().is_some())
    }
}

// Whether the key can specialize open generics changes the answer, so it is
// part of the request identity even though `Key` equality ignores it.
impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.discriminant() == other.discriminant() && self.key() == other.key()
    }
}

impl Eq for Request {}

impl Hash for Request {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        self.key().hash(state);
    }
}

/// A constructor argument.
#[derive(Clone)]
pub(crate) enum Argument {
    Site(SiteId),
    /// Optional parameter without a registration
    Missing,
    /// Declared default used in place of a missing registration
    Default(AnyArc),
}

#[derive(Clone)]
pub(crate) enum CallSiteKind {
    Constructor {
        implementation: &'static str,
        invoke: InvokeFn,
        args: Vec<Argument>,
    },
    Factory {
        factory: FactoryFn,
    },
    Enumerable {
        items: Vec<SiteId>,
    },
    ServiceProvider,
    ScopeFactory,
    Constant {
        value: AnyArc,
    },
}

/// One node of the graph.
#[derive(Clone)]
pub(crate) struct CallSite {
    pub(crate) service: Key,
    pub(crate) cache: CacheKey,
    pub(crate) lifetime: Lifetime,
    pub(crate) kind: CallSiteKind,
}

impl CallSite {
    /// Name used in diagnostics: the implementation for constructed services,
    /// the service otherwise.
    pub(crate) fn name(&self) -> &'static str {
        match &self.kind {
            CallSiteKind::Constructor { implementation, .. } => *implementation,
            _ => self.service.display_name(),
        }
    }

    /// Child nodes in argument order.
    pub(crate) fn children(&self) -> Vec<SiteId> {
        match &self.kind {
            CallSiteKind::Constructor { args, .. } => args
                .iter()
                .filter_map(|arg| match arg {
                    Argument::Site(id) => Some(*id),
                    _ => None,
                })
                .collect(),
            CallSiteKind::Enumerable { items } => items.clone(),
            _ => Vec::new(),
        }
    }
}

/// Append-only arena of committed call-sites shared by every scope.
#[derive(Default)]
pub(crate) struct CallSiteGraph {
    sites: RwLock<Vec<Arc<CallSite>>>,
}

impl CallSiteGraph {
    /// A committed node. Ids are only handed out after commit.
    pub(crate) fn site(&self, id: SiteId) -> Arc<CallSite> {
        self.sites.read()[id].clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.sites.read().len()
    }

    pub(crate) fn append(&self, sites: Vec<CallSite>) {
        self.sites.write().extend(sites.into_iter().map(Arc::new));
    }
}
