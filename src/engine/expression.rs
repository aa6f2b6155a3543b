//! Expression compilation: lowers a graph into nested closures once, so later
//! calls skip the graph lookups and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

use super::{provider_value, run_factory, scope_factory_value, Executor};
use crate::call_site::{Argument, CallSiteGraph, CallSiteKind, SiteId};
use crate::error::DiResult;
use crate::injectable::{AnyArc, Args};
use crate::provider::ScopeInner;

enum Operand {
    Site(Executor),
    Missing,
    Default(AnyArc),
}

pub(crate) fn compile(graph: &CallSiteGraph, root: SiteId) -> Executor {
    let mut lowered = HashMap::new();
    lower(graph, root, &mut lowered)
}

/// The graph is acyclic once committed, so the recursion terminates; shared
/// sub-graphs are lowered once.
fn lower(graph: &CallSiteGraph, id: SiteId, lowered: &mut HashMap<SiteId, Executor>) -> Executor {
    if let Some(executor) = lowered.get(&id) {
        return executor.clone();
    }

    let site = graph.site(id);
    let executor: Executor = match &site.kind {
        CallSiteKind::Constant { value } => {
            let value = value.clone();
            Arc::new(move |_: &Arc<ScopeInner>| -> DiResult<AnyArc> { Ok(value.clone()) })
        }
        CallSiteKind::ServiceProvider => {
            Arc::new(|scope: &Arc<ScopeInner>| -> DiResult<AnyArc> { Ok(provider_value(scope)) })
        }
        CallSiteKind::ScopeFactory => {
            Arc::new(|scope: &Arc<ScopeInner>| -> DiResult<AnyArc> { Ok(scope_factory_value(scope)) })
        }
        CallSiteKind::Enumerable { items } => {
            let items: Vec<Executor> = items.iter().map(|&item| lower(graph, item, lowered)).collect();
            Arc::new(move |scope: &Arc<ScopeInner>| -> DiResult<AnyArc> {
                let values = items.iter().map(|item| item(scope)).collect::<DiResult<Vec<_>>>()?;
                Ok(Arc::new(values))
            })
        }
        CallSiteKind::Constructor { invoke, args, .. } => {
            let operands: Vec<Operand> = args
                .iter()
                .map(|arg| match arg {
                    Argument::Site(child) => Operand::Site(lower(graph, *child, lowered)),
                    Argument::Missing => Operand::Missing,
                    Argument::Default(value) => Operand::Default(value.clone()),
                })
                .collect();
            let invoke = invoke.clone();
            let lifetime = site.lifetime;
            let cache = site.cache.clone();
            Arc::new(move |scope: &Arc<ScopeInner>| -> DiResult<AnyArc> {
                scope.realize(lifetime, &cache, |owner| {
                    let values = operands
                        .iter()
                        .map(|operand| match operand {
                            Operand::Site(executor) => executor(owner).map(Some),
                            Operand::Missing => Ok(None),
                            Operand::Default(value) => Ok(Some(value.clone())),
                        })
                        .collect::<DiResult<SmallVec<[Option<AnyArc>; 4]>>>()?;
                    invoke(&Args::new(values))
                })
            })
        }
        CallSiteKind::Factory { factory } => {
            let factory = factory.clone();
            let lifetime = site.lifetime;
            let cache = site.cache.clone();
            Arc::new(move |scope: &Arc<ScopeInner>| -> DiResult<AnyArc> {
                scope.realize(lifetime, &cache, |owner| run_factory(&factory, owner))
            })
        }
    };

    lowered.insert(id, executor.clone());
    executor
}
