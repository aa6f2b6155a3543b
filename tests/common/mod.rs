//! Shared helpers for integration tests.
#![allow(dead_code)]

use resolvent::{
    Constructor, DiError, Injectable, ProviderOptions, Resolver, ServiceCollection,
    ServiceProvider, ServiceProviderMode,
};

/// Routes engine logs to the test output. `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds `sc` once per execution mode.
pub fn providers(sc: &ServiceCollection) -> Vec<(ServiceProviderMode, ServiceProvider)> {
    providers_with(sc, ProviderOptions::default())
}

pub fn providers_with(
    sc: &ServiceCollection,
    options: ProviderOptions,
) -> Vec<(ServiceProviderMode, ServiceProvider)> {
    ServiceProviderMode::ALL
        .into_iter()
        .map(|mode| {
            let sp = sc
                .build_with_options(options.clone().mode(mode))
                .unwrap_or_else(|e| panic!("{mode}: build failed: {e}"));
            (mode, sp)
        })
        .collect()
}

/// The error of building and then resolving `T`, whichever fails first.
///
/// Eagerly validating modes report graph errors from `build`, the others
/// from the first resolution.
pub fn first_error<T: Send + Sync + 'static>(
    sc: &ServiceCollection,
    options: ProviderOptions,
) -> DiError {
    match sc.build_with_options(options) {
        Err(e) => e,
        Ok(sp) => match sp.get::<T>() {
            Err(e) => e,
            Ok(_) => panic!("resolving {} unexpectedly succeeded", std::any::type_name::<T>()),
        },
    }
}

/// Strips module paths from a type name.
pub fn short(name: &str) -> &str {
    let head = name.split('<').next().unwrap_or(name);
    head.rsplit("::").next().unwrap_or(head)
}

/// A service with a single parameterless constructor.
#[derive(Debug, Default)]
pub struct Leaf;

impl Injectable for Leaf {
    fn constructors() -> Vec<Constructor<Self>> {
        vec![Constructor::new(vec![], |_| Ok(Leaf))]
    }
}
