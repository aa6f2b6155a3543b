//! Property-based tests for service resolution.
//!
//! Registration order and lifetimes must produce the same observable results
//! regardless of the values registered or the execution mode.

mod common;

use common::providers;
use proptest::prelude::*;
use resolvent::{Lifetime, Resolver, ServiceCollection};
use std::sync::Arc;

fn lifetime() -> impl Strategy<Value = Lifetime> {
    prop_oneof![
        Just(Lifetime::Singleton),
        Just(Lifetime::Scoped),
        Just(Lifetime::Transient),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Property: enumerables preserve registration order and single resolution
    // returns the last registration
    #[test]
    fn registration_order_is_preserved(values in prop::collection::vec(any::<u32>(), 1..12)) {
        let mut sc = ServiceCollection::new();
        for value in &values {
            let value = *value;
            sc.add_transient_factory(move |_| Ok(value));
        }

        for (_, sp) in providers(&sc) {
            let all: Vec<u32> = sp.get_all::<u32>().unwrap().iter().map(|v| **v).collect();
            prop_assert_eq!(&all, &values);
            prop_assert_eq!(*sp.get_required::<u32>(), *values.last().unwrap());
        }
    }

    // Property: identity within and across scopes follows the lifetime
    #[test]
    fn identity_follows_lifetime(lifetimes in prop::collection::vec(lifetime(), 1..6)) {
        let mut sc = ServiceCollection::new();
        for (i, lifetime) in lifetimes.iter().enumerate() {
            sc.add_factory(*lifetime, move |_| Ok(i as u64));
        }
        let last = *lifetimes.last().unwrap();

        for (_, sp) in providers(&sc) {
            let s1 = sp.create_scope().unwrap();
            let s2 = sp.create_scope().unwrap();
            let a = s1.get_required::<u64>();
            let b = s1.get_required::<u64>();
            let c = s2.get_required::<u64>();

            prop_assert_eq!(*a as usize, lifetimes.len() - 1);
            match last {
                Lifetime::Singleton => {
                    prop_assert!(Arc::ptr_eq(&a, &b));
                    prop_assert!(Arc::ptr_eq(&a, &c));
                }
                Lifetime::Scoped => {
                    prop_assert!(Arc::ptr_eq(&a, &b));
                    prop_assert!(!Arc::ptr_eq(&a, &c));
                }
                Lifetime::Transient => {
                    prop_assert!(!Arc::ptr_eq(&a, &b));
                }
            }

            let all = s1.get_all::<u64>().unwrap();
            prop_assert_eq!(all.len(), lifetimes.len());
            prop_assert!(Arc::ptr_eq(&all[all.len() - 1], &a) != (last == Lifetime::Transient));
        }
    }
}
