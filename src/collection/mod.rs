//! Service collection module for dependency injection.
//!
//! This module contains the ServiceCollection type used to register services
//! and build service providers.

use std::sync::Arc;

use crate::descriptors::{Implementation, ServiceDescriptor};
use crate::error::DiResult;
use crate::injectable::{specialize, AnyArc, Constructor, Injectable, Instance};
use crate::key::{generic_definition, key_of_trait, key_of_type};
use crate::lifetime::Lifetime;
use crate::options::ProviderOptions;
use crate::provider::{ResolverContext, ServiceProvider};
use crate::registration::Registry;
use crate::traits::{Dispose, Disposer};

/// Ordered list of service registrations.
///
/// Registration order matters: the last registration of a service wins
/// single resolution, and enumerable resolution returns every registration
/// in the order it was added.
///
/// # Examples
///
/// ```rust
/// use resolvent::{Resolver, ServiceCollection};
///
/// let mut services = ServiceCollection::new();
/// services.add_instance(1u32);
/// services.add_instance(2u32);
///
/// let provider = services.build().unwrap();
/// assert_eq!(*provider.get_required::<u32>(), 2);
///
/// let all: Vec<u32> = provider.get_all::<u32>().unwrap().iter().map(|v| **v).collect();
/// assert_eq!(all, vec![1, 2]);
/// ```
#[derive(Default, Clone)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    // ----- Concrete Type Registrations -----

    /// Registers a ready-made instance, shared by every resolution.
    ///
    /// The container does not dispose instances it did not create.
    pub fn add_instance<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.push(ServiceDescriptor::new(
            key_of_type::<T>(),
            Lifetime::Singleton,
            Implementation::Instance(Arc::new(value)),
        ))
    }

    /// Registers `T`, activated through its declared constructors, with the
    /// given lifetime.
    pub fn add_type<T: Injectable>(&mut self, lifetime: Lifetime) -> &mut Self {
        self.push(ServiceDescriptor::new(
            key_of_type::<T>(),
            lifetime,
            Implementation::Constructors {
                name: std::any::type_name::<T>(),
                constructors: specialize::<T>(),
            },
        ))
    }

    /// Registers `T` as a singleton activated through its constructors.
    pub fn add_singleton<T: Injectable>(&mut self) -> &mut Self {
        self.add_type::<T>(Lifetime::Singleton)
    }

    /// Registers `T` as a scoped service activated through its constructors.
    pub fn add_scoped<T: Injectable>(&mut self) -> &mut Self {
        self.add_type::<T>(Lifetime::Scoped)
    }

    /// Registers `T` as a transient service activated through its constructors.
    pub fn add_transient<T: Injectable>(&mut self) -> &mut Self {
        self.add_type::<T>(Lifetime::Transient)
    }

    // ----- Factory Registrations -----

    /// Registers a factory producing `T` with the given lifetime.
    ///
    /// The factory receives a [`ResolverContext`] for the scope that will own
    /// the instance. Errors it returns reach the caller unchanged.
    pub fn add_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        let factory = move |ctx: &ResolverContext| -> DiResult<Instance> {
            Ok(Instance::new(Arc::new(factory(ctx)?)))
        };
        self.push(ServiceDescriptor::new(
            key_of_type::<T>(),
            lifetime,
            Implementation::Factory(Arc::new(factory)),
        ))
    }

    /// Registers a singleton factory, called at most once.
    ///
    /// ```rust
    /// use resolvent::{Resolver, ServiceCollection};
    ///
    /// struct Config { port: u16 }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_factory(|_| Ok(Config { port: 8080 }));
    ///
    /// let provider = services.build().unwrap();
    /// assert_eq!(provider.get_required::<Config>().port, 8080);
    /// ```
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Singleton, factory)
    }

    /// Registers a scoped factory, called at most once per scope.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Scoped, factory)
    }

    /// Registers a transient factory, called on every resolution.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.add_factory(Lifetime::Transient, factory)
    }

    /// Registers a factory whose instances are disposed by the scope that
    /// owns them.
    pub fn add_disposable_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Dispose,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        let factory = move |ctx: &ResolverContext| -> DiResult<Instance> {
            let value = Arc::new(factory(ctx)?);
            Ok(Instance::with_disposer(value.clone(), Disposer::sync(value)))
        };
        self.push(ServiceDescriptor::new(
            key_of_type::<T>(),
            lifetime,
            Implementation::Factory(Arc::new(factory)),
        ))
    }

    // ----- Trait Registrations -----

    /// Registers `T` as an implementation of trait `S`.
    ///
    /// `cast` converts the constructed `Arc<T>` into the trait object; for a
    /// plain unsizing coercion pass `|t| t`.
    ///
    /// ```rust
    /// use resolvent::{Constructor, Injectable, Lifetime, Resolver, ServiceCollection};
    ///
    /// trait Greeter: Send + Sync {
    ///     fn greet(&self) -> String;
    /// }
    ///
    /// struct English;
    /// impl Greeter for English {
    ///     fn greet(&self) -> String { "hello".into() }
    /// }
    /// impl Injectable for English {
    ///     fn constructors() -> Vec<Constructor<Self>> {
    ///         vec![Constructor::new(vec![], |_| Ok(English))]
    ///     }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_trait_impl::<dyn Greeter, English, _>(Lifetime::Singleton, |t| t);
    ///
    /// let provider = services.build().unwrap();
    /// assert_eq!(provider.get_required_trait::<dyn Greeter>().greet(), "hello");
    /// ```
    pub fn add_trait_impl<S, T, C>(&mut self, lifetime: Lifetime, cast: C) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Injectable,
        C: Fn(Arc<T>) -> Arc<S> + Clone + Send + Sync + 'static,
    {
        let constructors = T::constructors()
            .into_iter()
            .map(|ctor: Constructor<T>| ctor.erase_as::<S, C>(cast.clone()))
            .collect();
        self.push(ServiceDescriptor::new(
            key_of_trait::<S>(),
            lifetime,
            Implementation::Constructors {
                name: std::any::type_name::<T>(),
                constructors,
            },
        ))
    }

    /// Registers a factory producing an implementation of trait `S`.
    pub fn add_trait_factory<S, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        let factory = move |ctx: &ResolverContext| -> DiResult<Instance> {
            Ok(Instance::new(Arc::new(factory(ctx)?)))
        };
        self.push(ServiceDescriptor::new(
            key_of_trait::<S>(),
            lifetime,
            Implementation::Factory(Arc::new(factory)),
        ))
    }

    /// Registers a ready-made implementation of trait `S`.
    pub fn add_trait_instance<S>(&mut self, value: Arc<S>) -> &mut Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let value: AnyArc = Arc::new(value);
        self.push(ServiceDescriptor::new(
            key_of_trait::<S>(),
            Lifetime::Singleton,
            Implementation::Instance(value),
        ))
    }

    // ----- Open Generics -----

    /// Registers the generic definition of `T` for every closed instantiation.
    ///
    /// `T` is any instantiation of the definition (conventionally with `()`
    /// arguments); closed types are resolved with
    /// [`Resolver::get_generic`](crate::Resolver::get_generic) or injected
    /// through [`Parameter::of_generic`](crate::Parameter::of_generic).
    ///
    /// ```rust
    /// use resolvent::{Constructor, Injectable, Lifetime, Resolver, ServiceCollection};
    /// use std::marker::PhantomData;
    ///
    /// struct Repository<T> { _entity: PhantomData<T> }
    ///
    /// impl<T: Send + Sync + 'static> Injectable for Repository<T> {
    ///     fn constructors() -> Vec<Constructor<Self>> {
    ///         vec![Constructor::new(vec![], |_| Ok(Repository { _entity: PhantomData }))]
    ///     }
    /// }
    ///
    /// struct User;
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_open_generic::<Repository<()>>(Lifetime::Singleton);
    ///
    /// let provider = services.build().unwrap();
    /// let a = provider.get_generic::<Repository<User>>().unwrap();
    /// let b = provider.get_generic::<Repository<User>>().unwrap();
    /// assert!(std::sync::Arc::ptr_eq(&a, &b));
    /// ```
    pub fn add_open_generic<T: 'static>(&mut self, lifetime: Lifetime) -> &mut Self {
        let name = std::any::type_name::<T>();
        let definition = generic_definition(name).unwrap_or(name);
        self.push(ServiceDescriptor::new(
            key_of_type::<T>(),
            lifetime,
            Implementation::OpenGeneric { definition },
        ))
    }

    // ----- Introspection -----

    /// Registered descriptors, in registration order.
    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    // ----- Build -----

    /// Builds a provider with default options.
    ///
    /// Default options validate every registration up front, so graph errors
    /// (missing dependencies, cycles, ambiguous constructors) surface here.
    pub fn build(&self) -> DiResult<ServiceProvider> {
        self.build_with_options(ProviderOptions::default())
    }

    /// Builds a provider with the given options.
    ///
    /// The collection is snapshotted; later registrations do not affect the
    /// provider.
    pub fn build_with_options(&self, options: ProviderOptions) -> DiResult<ServiceProvider> {
        ServiceProvider::build(Registry::new(self.descriptors.clone()), &options)
    }
}
