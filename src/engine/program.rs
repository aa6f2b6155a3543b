//! Code generation: lowers a graph into a flat register program.
//!
//! Every op writes exactly one register, whose index is the op's position in
//! its block. Cached services own a nested block that only runs on a cache
//! miss, inside the scope that owns the instance; everything else is
//! evaluated inline in the requesting scope. Transient sub-graphs are emitted
//! once per use so that each use constructs its own instance.

use std::sync::Arc;

use smallvec::SmallVec;

use super::{provider_value, run_factory, scope_factory_value, Executor};
use crate::call_site::{Argument, CacheKey, CallSite, CallSiteGraph, CallSiteKind, SiteId};
use crate::descriptors::FactoryFn;
use crate::error::DiResult;
use crate::injectable::{AnyArc, Args, Instance, InvokeFn};
use crate::lifetime::Lifetime;
use crate::provider::ScopeInner;

type Reg = usize;

enum Operand {
    Reg(Reg),
    Missing,
    Default(AnyArc),
}

enum Make {
    Construct { invoke: InvokeFn, operands: Vec<Operand> },
    Factory(FactoryFn),
}

/// Instructions producing one service instance.
struct Body {
    ops: Vec<Op>,
    make: Make,
}

enum Op {
    Load(AnyArc),
    Provider,
    ScopeFactory,
    /// Resolve through the owning scope's cache; `body` runs on a miss
    Cached { lifetime: Lifetime, cache: CacheKey, body: Arc<Body> },
    /// Construct in the requesting scope and track for disposal
    Transient(Make),
    Collect(Vec<Reg>),
}

struct Program {
    ops: Vec<Op>,
    result: Reg,
}

pub(crate) fn compile(graph: &CallSiteGraph, root: SiteId) -> Executor {
    let mut ops = Vec::new();
    let result = emit(graph, root, &mut ops);
    let program = Program { ops, result };
    Arc::new(move |scope: &Arc<ScopeInner>| program.run(scope))
}

fn emit(graph: &CallSiteGraph, id: SiteId, block: &mut Vec<Op>) -> Reg {
    let site = graph.site(id);
    let op = match &site.kind {
        CallSiteKind::Constant { value } => Op::Load(value.clone()),
        CallSiteKind::ServiceProvider => Op::Provider,
        CallSiteKind::ScopeFactory => Op::ScopeFactory,
        CallSiteKind::Enumerable { items } => {
            Op::Collect(items.iter().map(|&item| emit(graph, item, block)).collect())
        }
        CallSiteKind::Constructor { invoke, args, .. } => wrap(&site, block, |block| Make::Construct {
            invoke: invoke.clone(),
            operands: args
                .iter()
                .map(|arg| match arg {
                    Argument::Site(child) => Operand::Reg(emit(graph, *child, block)),
                    Argument::Missing => Operand::Missing,
                    Argument::Default(value) => Operand::Default(value.clone()),
                })
                .collect(),
        }),
        CallSiteKind::Factory { factory } => wrap(&site, block, |_| Make::Factory(factory.clone())),
    };
    block.push(op);
    block.len() - 1
}

/// Emits the dependencies of a made service into the right block.
fn wrap(site: &CallSite, block: &mut Vec<Op>, make: impl FnOnce(&mut Vec<Op>) -> Make) -> Op {
    match site.lifetime {
        Lifetime::Transient => Op::Transient(make(block)),
        lifetime => {
            let mut ops = Vec::new();
            let make = make(&mut ops);
            Op::Cached {
                lifetime,
                cache: site.cache.clone(),
                body: Arc::new(Body { ops, make }),
            }
        }
    }
}

impl Program {
    fn run(&self, scope: &Arc<ScopeInner>) -> DiResult<AnyArc> {
        let mut regs = execute(&self.ops, scope)?;
        Ok(regs.swap_remove(self.result))
    }
}

fn execute(ops: &[Op], scope: &Arc<ScopeInner>) -> DiResult<Vec<AnyArc>> {
    let mut regs: Vec<AnyArc> = Vec::with_capacity(ops.len());
    for op in ops {
        let value: AnyArc = match op {
            Op::Load(value) => value.clone(),
            Op::Provider => provider_value(scope),
            Op::ScopeFactory => scope_factory_value(scope),
            Op::Collect(items) => {
                let values: Vec<AnyArc> = items.iter().map(|&reg| regs[reg].clone()).collect();
                Arc::new(values)
            }
            Op::Transient(make) => {
                let instance = make.apply(&regs, scope)?;
                scope.capture(instance)?
            }
            Op::Cached { lifetime, cache, body } => scope.realize(*lifetime, cache, |owner| {
                let inner = execute(&body.ops, owner)?;
                body.make.apply(&inner, owner)
            })?,
        };
        regs.push(value);
    }
    Ok(regs)
}

impl Make {
    fn apply(&self, regs: &[AnyArc], owner: &Arc<ScopeInner>) -> DiResult<Instance> {
        match self {
            Make::Construct { invoke, operands } => {
                let values: SmallVec<[Option<AnyArc>; 4]> = operands
                    .iter()
                    .map(|operand| match operand {
                        Operand::Reg(reg) => Some(regs[*reg].clone()),
                        Operand::Missing => None,
                        Operand::Default(value) => Some(value.clone()),
                    })
                    .collect();
                invoke(&Args::new(values))
            }
            Make::Factory(factory) => run_factory(factory, owner),
        }
    }
}
