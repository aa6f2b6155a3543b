//! Interpreted execution: walks the graph on every call.

use std::sync::Arc;

use smallvec::SmallVec;

use super::{provider_value, run_factory, scope_factory_value};
use crate::call_site::{Argument, CallSiteGraph, CallSiteKind, SiteId};
use crate::error::DiResult;
use crate::injectable::{AnyArc, Args};
use crate::provider::ScopeInner;

pub(crate) fn resolve(graph: &CallSiteGraph, id: SiteId, scope: &Arc<ScopeInner>) -> DiResult<AnyArc> {
    let site = graph.site(id);
    match &site.kind {
        CallSiteKind::Constant { value } => Ok(value.clone()),
        CallSiteKind::ServiceProvider => Ok(provider_value(scope)),
        CallSiteKind::ScopeFactory => Ok(scope_factory_value(scope)),
        CallSiteKind::Enumerable { items } => {
            let values = items
                .iter()
                .map(|&item| resolve(graph, item, scope))
                .collect::<DiResult<Vec<_>>>()?;
            Ok(Arc::new(values))
        }
        CallSiteKind::Constructor { invoke, args, .. } => scope.realize(site.lifetime, &site.cache, |owner| {
            let values = args
                .iter()
                .map(|arg| argument(graph, arg, owner))
                .collect::<DiResult<SmallVec<[Option<AnyArc>; 4]>>>()?;
            invoke(&Args::new(values))
        }),
        CallSiteKind::Factory { factory } => {
            scope.realize(site.lifetime, &site.cache, |owner| run_factory(factory, owner))
        }
    }
}

fn argument(graph: &CallSiteGraph, arg: &Argument, scope: &Arc<ScopeInner>) -> DiResult<Option<AnyArc>> {
    match arg {
        Argument::Site(id) => resolve(graph, *id, scope).map(Some),
        Argument::Missing => Ok(None),
        Argument::Default(value) => Ok(Some(value.clone())),
    }
}
