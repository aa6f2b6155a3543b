//! Adaptive execution: interpret first, compile roots that prove hot.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use super::{interpreter, Compiler, Engine};
use crate::call_site::SiteId;
use crate::error::DiResult;
use crate::injectable::AnyArc;
use crate::provider::ScopeInner;

/// Counts calls per root and swaps in a compiled executor once a root has
/// been resolved `threshold` times.
///
/// Compilation runs on the rayon pool. Each call picks its executor when it
/// starts, so in-flight interpreted calls finish on the interpreter while the
/// compiled form is installed.
pub(crate) struct Adaptive {
    compiler: Compiler,
    threshold: usize,
    calls: DashMap<SiteId, AtomicUsize>,
}

impl Adaptive {
    pub(crate) fn new(compiler: Compiler, threshold: usize) -> Self {
        Self {
            compiler,
            threshold: threshold.max(1),
            calls: DashMap::new(),
        }
    }

    pub(crate) fn execute(&self, engine: &Arc<Engine>, root: SiteId, scope: &Arc<ScopeInner>) -> DiResult<AnyArc> {
        if let Some(executor) = engine.cached_executor(root) {
            return executor(scope);
        }

        let calls = self
            .calls
            .entry(root)
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::Relaxed)
            + 1;
        if calls == self.threshold {
            let engine = Arc::clone(engine);
            let compiler = self.compiler;
            tracing::debug!(root, calls, ?compiler, "promoting hot call-site to compiled execution");
            rayon::spawn(move || {
                engine.install(root, compiler);
            });
        }

        interpreter::resolve(engine.graph(), root, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call_site::Request;
    use crate::key::key_of_type;
    use crate::options::{ProviderOptions, ServiceProviderMode};
    use crate::{Resolver, ServiceCollection};
    use std::time::{Duration, Instant};

    struct Counter(u32);

    #[test]
    fn test_hot_root_is_compiled_in_background() {
        let mut services = ServiceCollection::new();
        services.add_transient_factory(|_| Ok(Counter(7)));
        let provider = services
            .build_with_options(ProviderOptions::new().mode(ServiceProviderMode::Dynamic).compile_threshold(2))
            .unwrap();

        let engine = provider.engine();
        let root = engine
            .root(&Request::One(key_of_type::<Counter>()))
            .unwrap()
            .unwrap()
            .site;
        assert!(engine.cached_executor(root).is_none());

        for _ in 0..2 {
            assert_eq!(provider.get_required::<Counter>().0, 7);
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.cached_executor(root).is_none() {
            assert!(Instant::now() < deadline, "compilation never installed");
            std::thread::sleep(Duration::from_millis(5));
        }

        // Compiled execution yields the same observable result.
        assert_eq!(provider.get_required::<Counter>().0, 7);
    }

    #[test]
    fn test_cold_root_stays_interpreted() {
        let mut services = ServiceCollection::new();
        services.add_transient_factory(|_| Ok(Counter(1)));
        let provider = services
            .build_with_options(ProviderOptions::new().mode(ServiceProviderMode::Dynamic).compile_threshold(100))
            .unwrap();

        provider.get_required::<Counter>();
        let engine = provider.engine();
        let root = engine
            .root(&Request::One(key_of_type::<Counter>()))
            .unwrap()
            .unwrap()
            .site;
        std::thread::sleep(Duration::from_millis(20));
        assert!(engine.cached_executor(root).is_none());
    }
}
