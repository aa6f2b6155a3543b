//! Resolver traits for service resolution.

use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::injectable::{downcast_trait, AnyArc, Injectable};
use crate::key::{key_of_generic, key_of_trait, key_of_type, Key};

/// The provider abstraction: object-safe, type-erased service lookup.
///
/// Every scope and the root provider implement it, and it is what services
/// receive when they depend on "the current provider". A caller may wrap or
/// replace it through the provider substitution hook
/// ([`ProviderOptions::provider_factory`](crate::ProviderOptions::provider_factory)).
///
/// Most users should use the [`Resolver`] trait instead, which provides
/// typed generic methods on top of this trait.
pub trait ResolverCore: Send + Sync {
    /// Resolves a single service.
    ///
    /// Returns `Ok(None)` when nothing is registered for `key`; every other
    /// failure (validation, disposed scope, constructor errors) is an `Err`.
    fn resolve_any(&self, key: &Key) -> DiResult<Option<AnyArc>>;

    /// Resolves every registration of `key` in registration order.
    ///
    /// Never fails for an unregistered key; the result is then empty.
    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>>;
}

/// Creates scopes. Resolvable as `dyn ScopeFactory`.
pub trait ScopeFactory: Send + Sync {
    /// Creates a new scope.
    fn create_scope(&self) -> DiResult<Box<dyn ServiceScope>>;
}

/// A scope handed out by a [`ScopeFactory`].
pub trait ServiceScope: Send + Sync {
    /// The provider resolving from this scope.
    fn provider(&self) -> Arc<dyn ResolverCore>;

    /// Disposes the scope and every disposable it owns.
    fn dispose(&self) -> DiResult<()>;
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// Implemented for every [`ResolverCore`], including `dyn ResolverCore`, so a
/// provider received as a dependency offers the same API as the façade.
///
/// # Examples
///
/// ```
/// use resolvent::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str);
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) {
///         println!("LOG: {}", msg);
///     }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_instance(42usize);
/// collection.add_trait_instance::<dyn Logger>(Arc::new(ConsoleLogger));
///
/// let provider = collection.build().unwrap();
///
/// let number = provider.get_required::<usize>();
/// assert_eq!(*number, 42);
///
/// let logger = provider.get_required_trait::<dyn Logger>();
/// logger.log("Service resolved successfully");
///
/// // Unregistered services are simply absent
/// assert!(provider.get_service::<String>().unwrap().is_none());
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service, `None` when it is not registered.
    fn get_service<T: Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        match self.resolve_any(&key_of_type::<T>())? {
            None => Ok(None),
            Some(any) => any
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
        }
    }

    /// Resolves a concrete service type.
    fn get<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.get_service::<T>()?
            .ok_or(DiError::NotFound(std::any::type_name::<T>()))
    }

    /// Resolves a concrete service type, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the service cannot be resolved.
    fn get_required<T: Send + Sync + 'static>(&self) -> Arc<T> {
        self.get::<T>()
            .unwrap_or_else(|e| panic!("Failed to resolve {}: {}", std::any::type_name::<T>(), e))
    }

    /// Resolves a trait-object service, `None` when it is not registered.
    fn get_service_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        match self.resolve_any(&key_of_trait::<T>())? {
            None => Ok(None),
            Some(any) => downcast_trait::<T>(&any).map(Some),
        }
    }

    /// Resolves the last registered implementation of trait `T`.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.get_service_trait::<T>()?
            .ok_or(DiError::NotFound(std::any::type_name::<T>()))
    }

    /// Resolves a trait implementation, panicking on failure.
    ///
    /// # Panics
    ///
    /// Panics if the trait cannot be resolved.
    fn get_required_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Arc<T> {
        self.get_trait::<T>().unwrap_or_else(|e| {
            panic!("Failed to resolve trait {}: {}", std::any::type_name::<T>(), e)
        })
    }

    /// Resolves every registration of `T` in registration order.
    fn get_all<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve_many(&key_of_type::<T>())?
            .into_iter()
            .map(|any| {
                any.downcast::<T>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
            })
            .collect()
    }

    /// Resolves every implementation of trait `T` in registration order.
    ///
    /// ```
    /// use resolvent::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Plugin: Send + Sync {
    ///     fn name(&self) -> &str;
    /// }
    ///
    /// struct PluginA;
    /// impl Plugin for PluginA {
    ///     fn name(&self) -> &str { "Plugin A" }
    /// }
    ///
    /// struct PluginB;
    /// impl Plugin for PluginB {
    ///     fn name(&self) -> &str { "Plugin B" }
    /// }
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_trait_instance::<dyn Plugin>(Arc::new(PluginA));
    /// collection.add_trait_instance::<dyn Plugin>(Arc::new(PluginB));
    ///
    /// let provider = collection.build().unwrap();
    /// let plugins = provider.get_all_trait::<dyn Plugin>().unwrap();
    /// assert_eq!(plugins.len(), 2);
    /// assert_eq!(plugins[0].name(), "Plugin A");
    /// assert_eq!(plugins[1].name(), "Plugin B");
    ///
    /// // Single resolution: last registration wins
    /// assert_eq!(provider.get_required_trait::<dyn Plugin>().name(), "Plugin B");
    /// ```
    fn get_all_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.resolve_many(&key_of_trait::<T>())?
            .iter()
            .map(downcast_trait::<T>)
            .collect()
    }

    /// Resolves a closed generic type, specializing an open-generic
    /// registration of its definition when no exact registration exists.
    fn get_generic<T: Injectable>(&self) -> DiResult<Arc<T>> {
        match self.resolve_any(&key_of_generic::<T>())? {
            None => Err(DiError::NotFound(std::any::type_name::<T>())),
            Some(any) => any
                .downcast::<T>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
        }
    }

    /// The current provider, as a dependent service would receive it.
    fn get_provider(&self) -> DiResult<Arc<dyn ResolverCore>> {
        self.get_trait::<dyn ResolverCore>()
    }

    /// The scope factory visible from this resolver.
    fn get_scope_factory(&self) -> DiResult<Arc<dyn ScopeFactory>> {
        self.get_trait::<dyn ScopeFactory>()
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
