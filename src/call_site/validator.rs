//! Graph validation: cycles and lifetime violations.
//!
//! Runs over the sites of one build session. Committed sites were validated
//! when they were committed and can never point back into a session, so only
//! their cached scoped-dependency result is consulted.

use super::{CallSite, CallSiteKind, SiteId};
use crate::error::{DiError, DiResult};
use crate::lifetime::Lifetime;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Validates the pending sites `base..base + pending.len()`.
///
/// Returns, per pending site, the scoped service it depends on through
/// transient or enumerable hops, if any. A singleton depending on such a
/// service is a captive dependency: an error when `validate_scopes` is set,
/// a warning otherwise.
pub(crate) fn validate(
    pending: &[CallSite],
    base: SiteId,
    committed: &[Option<&'static str>],
    validate_scopes: bool,
) -> DiResult<Vec<Option<&'static str>>> {
    let mut validator = Validator {
        pending,
        base,
        committed,
        validate_scopes,
        marks: vec![Mark::Unvisited; pending.len()],
        results: vec![None; pending.len()],
        path: Vec::new(),
    };
    for id in base..base + pending.len() {
        validator.visit(id)?;
    }
    Ok(validator.results)
}

struct Validator<'a> {
    pending: &'a [CallSite],
    base: SiteId,
    committed: &'a [Option<&'static str>],
    validate_scopes: bool,
    marks: Vec<Mark>,
    results: Vec<Option<&'static str>>,
    path: Vec<SiteId>,
}

impl<'a> Validator<'a> {
    fn visit(&mut self, id: SiteId) -> DiResult<Option<&'static str>> {
        if id < self.base {
            return Ok(self.committed.get(id).copied().flatten());
        }
        let local = id - self.base;
        match self.marks[local] {
            Mark::Done => return Ok(self.results[local]),
            Mark::OnPath => return Err(self.cycle(id)),
            Mark::Unvisited => {}
        }

        self.marks[local] = Mark::OnPath;
        self.path.push(id);

        let pending = self.pending;
        let site = &pending[local];
        let mut inherited = None;
        for child in site.children() {
            let scoped = self.visit(child)?;
            if inherited.is_none() {
                inherited = scoped;
            }
        }

        let scoped = match (&site.kind, site.lifetime) {
            (CallSiteKind::ServiceProvider | CallSiteKind::ScopeFactory, _) => None,
            (_, Lifetime::Scoped) => Some(site.name()),
            (_, Lifetime::Singleton) => {
                if let Some(scoped) = inherited {
                    self.captive(site, scoped)?;
                }
                None
            }
            (_, Lifetime::Transient) => inherited,
        };

        self.path.pop();
        self.marks[local] = Mark::Done;
        self.results[local] = scoped;
        Ok(scoped)
    }

    fn name(&self, id: SiteId) -> &'static str {
        self.pending[id - self.base].name()
    }

    fn cycle(&self, id: SiteId) -> DiError {
        let start = self.path.iter().position(|&p| p == id).unwrap_or(0);
        let mut names: Vec<&'static str> = self.path[start..].iter().map(|&p| self.name(p)).collect();
        names.push(self.name(id));
        DiError::Circular(names)
    }

    fn captive(&self, site: &CallSite, scoped: &'static str) -> DiResult<()> {
        if self.validate_scopes {
            return Err(DiError::CaptiveDependency { singleton: site.name(), scoped });
        }
        tracing::warn!(singleton = site.name(), scoped, "singleton captures a scoped dependency");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_site::{Argument, CacheKey};
    use crate::injectable::{AnyArc, Args, Instance};
    use crate::key::key_of_type;
    use std::sync::Arc;

    struct A;
    struct B;
    struct C;

    fn site<T: 'static>(lifetime: Lifetime, children: &[SiteId]) -> CallSite {
        let key = key_of_type::<T>();
        CallSite {
            service: key.clone(),
            cache: CacheKey { key, slot: 0 },
            lifetime,
            kind: CallSiteKind::Constructor {
                implementation: std::any::type_name::<T>(),
                invoke: Arc::new(|_: &Args| -> DiResult<Instance> { Ok(Instance::new(Arc::new(()) as AnyArc)) }),
                args: children.iter().map(|&id| Argument::Site(id)).collect(),
            },
        }
    }

    #[test]
    fn test_cycle_is_reported_with_path() {
        // A -> B -> A
        let pending = vec![site::<A>(Lifetime::Transient, &[1]), site::<B>(Lifetime::Transient, &[0])];
        match validate(&pending, 0, &[], false) {
            Err(DiError::Circular(path)) => {
                let short: Vec<&str> = path.iter().map(|n| n.rsplit("::").next().unwrap()).collect();
                assert_eq!(short, vec!["A", "B", "A"]);
            }
            other => panic!("expected cycle, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let pending = vec![site::<A>(Lifetime::Singleton, &[0])];
        assert!(matches!(validate(&pending, 0, &[], false), Err(DiError::Circular(p)) if p.len() == 2));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        // A -> {B, C}, B -> C
        let pending = vec![
            site::<A>(Lifetime::Transient, &[1, 2]),
            site::<B>(Lifetime::Transient, &[2]),
            site::<C>(Lifetime::Transient, &[]),
        ];
        assert!(validate(&pending, 0, &[], true).is_ok());
    }

    #[test]
    fn test_scoped_dependency_flows_through_transients() {
        // A(transient) -> B(transient) -> C(scoped)
        let pending = vec![
            site::<A>(Lifetime::Transient, &[1]),
            site::<B>(Lifetime::Transient, &[2]),
            site::<C>(Lifetime::Scoped, &[]),
        ];
        let results = validate(&pending, 0, &[], true).unwrap();
        assert!(results.iter().all(|r| r.is_some_and(|n| n.ends_with("::C"))));
    }

    #[test]
    fn test_captive_dependency_depends_on_toggle() {
        let pending = vec![site::<A>(Lifetime::Singleton, &[1]), site::<B>(Lifetime::Scoped, &[])];
        assert!(matches!(
            validate(&pending, 0, &[], true),
            Err(DiError::CaptiveDependency { .. })
        ));
        let results = validate(&pending, 0, &[], false).unwrap();
        assert_eq!(results[0], None);
    }

    #[test]
    fn test_committed_results_are_reused() {
        // Site 0 is committed and known to depend on a scoped service.
        let pending = vec![site::<A>(Lifetime::Singleton, &[0])];
        let committed = [Some("Scoped")];
        assert!(matches!(
            validate(&pending, 1, &committed, true),
            Err(DiError::CaptiveDependency { scoped: "Scoped", .. })
        ));
    }
}
