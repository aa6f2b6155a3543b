//! Service provider module for dependency injection.
//!
//! This module contains the ServiceProvider façade, scopes, and the context
//! handed to factory functions.

use std::fmt;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::DiResult;
use crate::injectable::AnyArc;
use crate::key::Key;
use crate::options::{ProviderOptions, ServiceProviderMode};
use crate::registration::Registry;
use crate::traits::ResolverCore;

pub mod context;
pub mod scope;

pub use context::ResolverContext;
pub use scope::Scope;
pub(crate) use scope::ScopeInner;

/// Service provider for resolving dependencies from the DI container.
///
/// The provider owns the root scope: singletons live there and are disposed,
/// in reverse creation order, when the provider is disposed or its last
/// clone is dropped. Cloning is cheap and every clone shares the same root.
///
/// # Thread Safety
///
/// `ServiceProvider` is `Send + Sync`. Concurrent resolutions of the same
/// singleton (or of the same scoped service within one scope) construct it
/// exactly once.
///
/// # Examples
///
/// ```
/// use resolvent::{Constructor, Injectable, Parameter, ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// impl Injectable for UserService {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new(vec![Parameter::of::<Database>()], |args| {
///             Ok(UserService { db: args.get(0)? })
///         })]
///     }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_instance(Database { url: "postgres://localhost".to_string() });
/// collection.add_transient::<UserService>();
///
/// let provider = collection.build().unwrap();
/// let user_service = provider.get_required::<UserService>();
/// assert_eq!(user_service.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    engine: Arc<Engine>,
    root: Arc<ScopeInner>,
}

impl Drop for ProviderInner {
    fn drop(&mut self) {
        if let Err(e) = self.root.dispose() {
            tracing::warn!(error = %e, "root scope disposal on drop failed");
        }
    }
}

impl ServiceProvider {
    pub(crate) fn build(registry: Registry, options: &ProviderOptions) -> DiResult<Self> {
        let engine = Arc::new(Engine::new(registry, options));
        if options.eager_validation() {
            engine.validate_all()?;
        }
        tracing::debug!(
            mode = %engine.mode,
            registrations = engine.registration_count(),
            validate_scopes = engine.validate_scopes,
            "service provider built"
        );
        let root = ScopeInner::new_root(engine.clone());
        Ok(Self { inner: Arc::new(ProviderInner { engine, root }) })
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &Arc<Engine> {
        &self.inner.engine
    }

    /// Creates a new scope for resolving scoped services.
    ///
    /// Each scope caches its own scoped instances. Scopes are children of the
    /// root, so disposing the provider disposes any scope still alive.
    ///
    /// # Examples
    ///
    /// ```
    /// use resolvent::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// struct RequestId(usize);
    ///
    /// let counter = Arc::new(AtomicUsize::new(0));
    /// let next = counter.clone();
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_scoped_factory(move |_| {
    ///     Ok(RequestId(next.fetch_add(1, Ordering::SeqCst)))
    /// });
    ///
    /// let provider = collection.build().unwrap();
    /// let scope1 = provider.create_scope().unwrap();
    /// let scope2 = provider.create_scope().unwrap();
    ///
    /// let req1a = scope1.get_required::<RequestId>();
    /// let req1b = scope1.get_required::<RequestId>(); // Same instance
    /// let req2 = scope2.get_required::<RequestId>(); // Different instance
    ///
    /// assert!(Arc::ptr_eq(&req1a, &req1b));
    /// assert!(!Arc::ptr_eq(&req1a, &req2));
    /// ```
    pub fn create_scope(&self) -> DiResult<Scope> {
        self.inner.root.create_child().map(Scope::new)
    }

    /// Disposes every scope still alive, then the singletons this provider
    /// created, in reverse creation order.
    ///
    /// Further resolutions fail with [`DiError::ObjectDisposed`](crate::DiError::ObjectDisposed).
    pub fn dispose(&self) -> DiResult<()> {
        self.inner.root.dispose()
    }

    /// Like [`dispose`](Self::dispose), awaiting asynchronous disposers.
    ///
    /// ```
    /// use resolvent::{AsyncDispose, Constructor, Disposer, Injectable, ServiceCollection, Resolver};
    /// use async_trait::async_trait;
    /// use std::sync::Arc;
    ///
    /// struct Client;
    ///
    /// #[async_trait]
    /// impl AsyncDispose for Client {
    ///     async fn dispose(&self) {
    ///         println!("Client disposed");
    ///     }
    /// }
    ///
    /// impl Injectable for Client {
    ///     fn constructors() -> Vec<Constructor<Self>> {
    ///         vec![Constructor::new(vec![], |_| Ok(Client))]
    ///     }
    ///
    ///     fn disposer(this: &Arc<Self>) -> Option<Disposer> {
    ///         Some(Disposer::asynchronous(this.clone()))
    ///     }
    /// }
    ///
    /// # async fn example() {
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton::<Client>();
    ///
    /// let provider = services.build().unwrap();
    /// let _client = provider.get_required::<Client>();
    /// provider.dispose_async().await;
    /// # }
    /// ```
    pub async fn dispose_async(&self) {
        self.inner.root.dispose_async().await
    }

    /// Whether the provider has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.root.is_disposed()
    }

    /// The execution mode this provider was built with.
    pub fn mode(&self) -> ServiceProviderMode {
        self.inner.engine.mode
    }

    /// The root provider as dependents of singletons see it.
    pub fn provider(&self) -> Arc<dyn ResolverCore> {
        self.inner.root.provider_handle()
    }
}

impl ResolverCore for ServiceProvider {
    fn resolve_any(&self, key: &Key) -> DiResult<Option<AnyArc>> {
        self.inner.root.lookup(key)
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.inner.root.lookup_many(key)
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("mode", &self.inner.engine.mode)
            .field("registrations", &self.inner.engine.registration_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
