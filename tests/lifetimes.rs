mod common;

use common::{providers, Leaf};
use resolvent::{Constructor, Injectable, Lifetime, Parameter, Resolver, ServiceCollection};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

struct Counted {
    id: usize,
}

fn counted(lifetime: Lifetime) -> (ServiceCollection, Arc<AtomicUsize>) {
    let created = Arc::new(AtomicUsize::new(0));
    let next = created.clone();
    let mut sc = ServiceCollection::new();
    sc.add_factory(lifetime, move |_| {
        Ok(Counted { id: next.fetch_add(1, Ordering::SeqCst) })
    });
    (sc, created)
}

#[test]
fn test_singleton_shared_across_scopes() {
    let (sc, _) = counted(Lifetime::Singleton);
    for (mode, sp) in providers(&sc) {
        let a = sp.get_required::<Counted>();
        let scope = sp.create_scope().unwrap();
        let b = scope.get_required::<Counted>();
        let nested = scope.create_child_scope().unwrap();
        let c = nested.get_required::<Counted>();
        assert!(Arc::ptr_eq(&a, &b), "{mode}");
        assert!(Arc::ptr_eq(&b, &c), "{mode}");
    }
}

#[test]
fn test_scoped_once_per_scope() {
    let (sc, created) = counted(Lifetime::Scoped);
    for (mode, sp) in providers(&sc) {
        created.store(0, Ordering::SeqCst);
        let s1 = sp.create_scope().unwrap();
        let s2 = sp.create_scope().unwrap();

        let a = s1.get_required::<Counted>();
        let b = s1.get_required::<Counted>();
        let c = s2.get_required::<Counted>();

        assert!(Arc::ptr_eq(&a, &b), "{mode}");
        assert!(!Arc::ptr_eq(&a, &c), "{mode}");
        assert_eq!(created.load(Ordering::SeqCst), 2, "{mode}");
    }
}

#[test]
fn test_nested_scope_does_not_inherit_scoped_instances() {
    let (sc, _) = counted(Lifetime::Scoped);
    for (mode, sp) in providers(&sc) {
        let parent = sp.create_scope().unwrap();
        let child = parent.create_child_scope().unwrap();
        let a = parent.get_required::<Counted>();
        let b = child.get_required::<Counted>();
        assert_ne!(a.id, b.id, "{mode}");
    }
}

#[test]
fn test_transient_fresh_every_time() {
    let (sc, created) = counted(Lifetime::Transient);
    for (mode, sp) in providers(&sc) {
        created.store(0, Ordering::SeqCst);
        let ids: Vec<usize> = (0..5).map(|_| sp.get_required::<Counted>().id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4], "{mode}");
    }
}

#[test]
fn test_scoped_from_root_is_root_singleton_without_validation() {
    let (sc, created) = counted(Lifetime::Scoped);
    for (mode, sp) in providers(&sc) {
        created.store(0, Ordering::SeqCst);
        let a = sp.get_required::<Counted>();
        let b = sp.get_required::<Counted>();
        assert!(Arc::ptr_eq(&a, &b), "{mode}");
        assert_eq!(created.load(Ordering::SeqCst), 1, "{mode}");
    }
}

struct Handler {
    leaf: Arc<Leaf>,
}

impl Injectable for Handler {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![Parameter::of::<Leaf>()], |args| {
            Ok(Handler { leaf: args.get(0)? })
        })]
    }
}

#[test]
fn test_transient_shares_scoped_dependency_within_scope() {
    let mut sc = ServiceCollection::new();
    sc.add_scoped::<Leaf>();
    sc.add_transient::<Handler>();

    for (mode, sp) in providers(&sc) {
        let scope = sp.create_scope().unwrap();
        let h1 = scope.get_required::<Handler>();
        let h2 = scope.get_required::<Handler>();
        assert!(!Arc::ptr_eq(&h1, &h2), "{mode}");
        assert!(Arc::ptr_eq(&h1.leaf, &h2.leaf), "{mode}");

        let other = sp.create_scope().unwrap();
        let h3 = other.get_required::<Handler>();
        assert!(!Arc::ptr_eq(&h1.leaf, &h3.leaf), "{mode}");
    }
}

#[test]
fn test_concurrent_singleton_constructed_once_across_scopes() {
    let created = Arc::new(AtomicUsize::new(0));
    let next = created.clone();
    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory(move |_| {
        next.fetch_add(1, Ordering::SeqCst);
        thread::sleep(std::time::Duration::from_millis(10));
        Ok(Counted { id: 7 })
    });

    for (mode, sp) in providers(&sc) {
        created.store(0, Ordering::SeqCst);
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sp = sp.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let scope = sp.create_scope().unwrap();
                    barrier.wait();
                    scope.get_required::<Counted>()
                })
            })
            .collect();

        let resolved: Vec<Arc<Counted>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(created.load(Ordering::SeqCst), 1, "{mode}");
        assert!(resolved.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])), "{mode}");
    }
}

#[test]
fn test_concurrent_scoped_constructed_once_per_scope() {
    let (sc, created) = counted(Lifetime::Scoped);
    for (mode, sp) in providers(&sc) {
        created.store(0, Ordering::SeqCst);
        let scope = Arc::new(sp.create_scope().unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scope = scope.clone();
                thread::spawn(move || scope.get_required::<Counted>().id)
            })
            .collect();
        let ids: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.iter().all(|id| *id == ids[0]), "{mode}");
        assert_eq!(created.load(Ordering::SeqCst), 1, "{mode}");
    }
}
