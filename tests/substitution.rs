//! Provider substitution: every execution mode must behave identically when
//! the provider handed to dependents is replaced by a delegating wrapper or
//! by a factory that resolves the provider from itself.

mod common;

use common::{providers, providers_with};
use resolvent::{
    AnyArc, Constructor, DiResult, Injectable, Key, Parameter, ProviderOptions, Resolver,
    ResolverCore, ScopeFactory, ServiceCollection, ServiceScope,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Delegating {
    inner: Arc<dyn ResolverCore>,
    calls: Arc<AtomicUsize>,
}

impl ResolverCore for Delegating {
    fn resolve_any(&self, key: &Key) -> DiResult<Option<AnyArc>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve_any(key)
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve_many(key)
    }
}

fn custom(calls: &Arc<AtomicUsize>) -> ProviderOptions {
    let calls = calls.clone();
    ProviderOptions::default().provider_factory(move |inner| {
        Arc::new(Delegating { inner, calls: calls.clone() }) as Arc<dyn ResolverCore>
    })
}

fn transitive_identity() -> ProviderOptions {
    ProviderOptions::default().provider_factory(|sp| match sp.get_provider() {
        Ok(resolved) => resolved,
        Err(_) => sp,
    })
}

fn substitutions(calls: &Arc<AtomicUsize>) -> Vec<(&'static str, ProviderOptions)> {
    vec![("custom", custom(calls)), ("identity", transitive_identity())]
}

struct Greeting(String);

struct Consumer {
    provider: Arc<dyn ResolverCore>,
}

impl Injectable for Consumer {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![Parameter::provider()], |args| {
            Ok(Consumer { provider: args.provider(0)? })
        })]
    }
}

fn collection() -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.add_instance(Greeting("hello".into()));
    sc.add_transient::<Consumer>();
    sc.add_scoped_factory(|ctx| {
        let greeting = ctx.get::<Greeting>()?;
        Ok(format!("{} from factory", greeting.0))
    });
    sc
}

#[test]
fn test_resolution_unchanged_under_substitution() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sc = collection();
    for (label, options) in substitutions(&calls) {
        for (mode, sp) in providers_with(&sc, options) {
            assert_eq!(sp.get_required::<Greeting>().0, "hello", "{label}/{mode}");

            let scope = sp.create_scope().unwrap();
            let consumer = scope.get_required::<Consumer>();
            assert_eq!(consumer.provider.get_required::<Greeting>().0, "hello", "{label}/{mode}");
            assert_eq!(*scope.get_required::<String>(), "hello from factory", "{label}/{mode}");

            let again = scope.get_required::<String>();
            assert!(Arc::ptr_eq(&again, &scope.get_required::<String>()), "{label}/{mode}");
        }
    }
}

#[test]
fn test_dependents_receive_substituted_provider() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sc = collection();
    for (mode, sp) in providers_with(&sc, custom(&calls)) {
        let consumer = sp.get_required::<Consumer>();
        let before = calls.load(Ordering::SeqCst);
        consumer.provider.get_required::<Greeting>();
        assert_eq!(calls.load(Ordering::SeqCst), before + 1, "{mode}");
    }
}

#[test]
fn test_factories_see_substituted_provider() {
    let seen = Arc::new(AtomicUsize::new(0));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut sc = ServiceCollection::new();
    sc.add_instance(2u8);
    let probe = seen.clone();
    sc.add_transient_factory(move |ctx| {
        probe.fetch_add(1, Ordering::SeqCst);
        Ok(u16::from(*ctx.get::<u8>()?) * 10)
    });

    for (mode, sp) in providers_with(&sc, custom(&calls)) {
        calls.store(0, Ordering::SeqCst);
        assert_eq!(*sp.get_required::<u16>(), 20, "{mode}");
        // The factory's lookup of u8 went through the wrapper
        assert_eq!(calls.load(Ordering::SeqCst), 1, "{mode}");
    }
    assert_eq!(seen.load(Ordering::SeqCst), 5);
}

#[test]
fn test_scope_factory_lookups_go_through_substituted_provider() {
    let calls = Arc::new(AtomicUsize::new(0));
    let sc = collection();
    for (mode, sp) in providers_with(&sc, custom(&calls)) {
        calls.store(0, Ordering::SeqCst);
        let factory = sp.get_scope_factory().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1, "{mode}");

        let scope = factory.create_scope().unwrap();
        let provider = scope.provider();
        assert_eq!(provider.get_required::<Greeting>().0, "hello", "{mode}");
        scope.dispose().unwrap();
    }
}

#[test]
fn test_builtin_services_enumerate_like_single_resolution() {
    let sc = collection();
    for (mode, sp) in providers(&sc) {
        let handles = sp.get_all_trait::<dyn ResolverCore>().unwrap();
        assert_eq!(handles.len(), 1, "{mode}");
        assert_eq!(handles[0].get_required::<Greeting>().0, "hello", "{mode}");

        let scope = sp.create_scope().unwrap();
        let factories = scope.get_all_trait::<dyn ScopeFactory>().unwrap();
        assert_eq!(factories.len(), 1, "{mode}");
        factories[0].create_scope().unwrap().dispose().unwrap();
    }

    let calls = Arc::new(AtomicUsize::new(0));
    for (mode, sp) in providers_with(&sc, custom(&calls)) {
        calls.store(0, Ordering::SeqCst);
        let factories = sp.get_all_trait::<dyn ScopeFactory>().unwrap();
        assert_eq!(factories.len(), 1, "{mode}");
        assert_eq!(calls.load(Ordering::SeqCst), 1, "{mode}");
    }
}

#[test]
fn test_provider_resolved_from_itself_under_identity_factory() {
    let sc = collection();
    for (mode, sp) in providers_with(&sc, transitive_identity()) {
        let handle = sp.get_provider().unwrap();
        let nested = handle.get_provider().unwrap();
        assert_eq!(nested.get_required::<Greeting>().0, "hello", "{mode}");

        let factory = handle.get_scope_factory().unwrap();
        let scope = factory.create_scope().unwrap();
        assert_eq!(*scope.provider().get_required::<String>(), "hello from factory", "{mode}");
    }
}

struct ScopeSpawner {
    factory: Arc<dyn ScopeFactory>,
}

impl Injectable for ScopeSpawner {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![Parameter::scope_factory()], |args| {
            Ok(ScopeSpawner { factory: args.scope_factory(0)? })
        })]
    }
}

#[test]
fn test_injected_scope_factory_creates_independent_scopes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut sc = collection();
    sc.add_singleton::<ScopeSpawner>();
    for (label, options) in substitutions(&calls) {
        for (mode, sp) in providers_with(&sc, options) {
            let spawner = sp.get_required::<ScopeSpawner>();
            let a = spawner.factory.create_scope().unwrap();
            let b = spawner.factory.create_scope().unwrap();
            let x = a.provider().get_required::<String>();
            let y = b.provider().get_required::<String>();
            assert!(!Arc::ptr_eq(&x, &y), "{label}/{mode}");
        }
    }
}
