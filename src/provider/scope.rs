//! Scoped service resolution and lifecycle management.
//!
//! A scope owns the instances it caches (scoped services, or singletons for
//! the root scope) and every disposable created on its behalf, including
//! transients it requested. Scopes are `Active` until disposed; disposal is
//! terminal, idempotent and cascades to child scopes first.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::call_site::{CacheKey, Request};
use crate::engine::Engine;
use crate::error::{DiError, DiResult};
use crate::injectable::{AnyArc, Instance};
use crate::internal::{circular, dispose_bag, substitution, DisposeBag};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::traits::{Disposer, ResolverCore, ScopeFactory, ServiceScope};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Construction slot of one cached instance; its lock serializes creation.
type Slot = Arc<Mutex<Option<AnyArc>>>;

type BoxFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

pub(crate) struct ScopeInner {
    pub(crate) id: u64,
    pub(crate) engine: Arc<Engine>,
    /// `None` for the root scope itself
    root: Option<Arc<ScopeInner>>,
    resolved: Mutex<HashMap<CacheKey, Slot>>,
    disposables: Mutex<DisposeBag>,
    children: Mutex<Vec<Weak<ScopeInner>>>,
    disposed: AtomicBool,
}

impl ScopeInner {
    pub(crate) fn new_root(engine: Arc<Engine>) -> Arc<Self> {
        Self::create(engine, None)
    }

    fn create(engine: Arc<Engine>, root: Option<Arc<ScopeInner>>) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            engine,
            root,
            resolved: Mutex::new(HashMap::new()),
            disposables: Mutex::new(DisposeBag::default()),
            children: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        })
    }

    /// Creates a child scope that is disposed no later than this one.
    pub(crate) fn create_child(self: &Arc<Self>) -> DiResult<Arc<Self>> {
        let mut children = self.children.lock();
        self.ensure_active()?;
        let child = Self::create(self.engine.clone(), Some(self.root().clone()));
        children.retain(|c| c.strong_count() > 0);
        children.push(Arc::downgrade(&child));
        tracing::trace!(scope = child.id, parent = self.id, "scope created");
        Ok(child)
    }

    fn root(self: &Arc<Self>) -> &Arc<Self> {
        self.root.as_ref().unwrap_or(self)
    }

    pub(crate) fn is_root(&self) -> bool {
        self.root.is_none()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn ensure_active(&self) -> DiResult<()> {
        if self.is_disposed() {
            return Err(DiError::ObjectDisposed);
        }
        Ok(())
    }

    /// Resolves a request from this scope.
    pub(crate) fn resolve(self: &Arc<Self>, request: &Request) -> DiResult<Option<AnyArc>> {
        self.ensure_active()?;
        let key = request.key();
        let _frame = if key.is_provider() || key.is_scope_factory() {
            None
        } else {
            Some(circular::enter_request(
                self.engine.id,
                key,
                matches!(request, Request::All(_)),
            )?)
        };

        let Some(root) = self.engine.root(request)? else {
            return Ok(None);
        };
        if self.engine.validate_scopes && self.is_root() {
            if let Some(scoped) = root.scoped {
                return Err(DiError::ScopedFromRoot { service: key.display_name(), scoped });
            }
        }
        self.engine.execute(root.site, self).map(Some)
    }

    pub(crate) fn resolve_many(self: &Arc<Self>, key: &Key) -> DiResult<Vec<AnyArc>> {
        match self.resolve(&Request::All(key.clone()))? {
            None => Ok(Vec::new()),
            Some(any) => any
                .downcast::<Vec<AnyArc>>()
                .map(|items| Arc::try_unwrap(items).unwrap_or_else(|shared| shared.as_ref().clone()))
                .map_err(|_| DiError::TypeMismatch(key.display_name())),
        }
    }

    /// Single lookup as issued by the public façades.
    ///
    /// With a provider factory installed, scope factory lookups go through
    /// the substituted provider so it can hand out its own factory.
    pub(crate) fn lookup(self: &Arc<Self>, key: &Key) -> DiResult<Option<AnyArc>> {
        if key.is_scope_factory() && self.engine.provider_factory.is_some() {
            self.ensure_active()?;
            return self.provider_handle().resolve_any(key);
        }
        self.resolve(&Request::One(key.clone()))
    }

    /// Enumerable counterpart of [`lookup`](Self::lookup).
    pub(crate) fn lookup_many(self: &Arc<Self>, key: &Key) -> DiResult<Vec<AnyArc>> {
        if key.is_scope_factory() && self.engine.provider_factory.is_some() {
            self.ensure_active()?;
            return self.provider_handle().resolve_many(key);
        }
        self.resolve_many(key)
    }

    /// Produces an instance according to its lifetime.
    ///
    /// Singletons are created in the root scope and transients in this one;
    /// `create` receives the scope that will own the instance and must
    /// resolve dependencies from it.
    pub(crate) fn realize(
        self: &Arc<Self>,
        lifetime: Lifetime,
        cache: &CacheKey,
        create: impl FnOnce(&Arc<ScopeInner>) -> DiResult<Instance>,
    ) -> DiResult<AnyArc> {
        match lifetime {
            Lifetime::Singleton => {
                let root = self.root();
                root.get_or_create(cache, || create(root))
            }
            Lifetime::Scoped => self.get_or_create(cache, || create(self)),
            Lifetime::Transient => {
                self.ensure_active()?;
                let instance = create(self)?;
                self.capture(instance)
            }
        }
    }

    /// At-most-once construction per cache key in this scope.
    fn get_or_create(
        &self,
        cache: &CacheKey,
        create: impl FnOnce() -> DiResult<Instance>,
    ) -> DiResult<AnyArc> {
        self.ensure_active()?;
        let _frame = circular::enter_slot(self.id, cache)?;
        let slot = self.resolved.lock().entry(cache.clone()).or_default().clone();

        let mut value = slot.lock();
        if let Some(existing) = value.as_ref() {
            return Ok(existing.clone());
        }
        let created = self.capture(create()?)?;
        *value = Some(created.clone());
        Ok(created)
    }

    /// Takes ownership of a new instance's disposal.
    ///
    /// An instance created while the scope was being disposed is disposed on
    /// the spot and the resolution fails.
    pub(crate) fn capture(&self, instance: Instance) -> DiResult<AnyArc> {
        let Instance { value, disposer } = instance;
        let Some(disposer) = disposer else {
            return Ok(value);
        };

        let mut bag = self.disposables.lock();
        if self.is_disposed() {
            drop(bag);
            if let Err(e) = dispose_bag::run_sync(vec![disposer]) {
                tracing::warn!(scope = self.id, error = %e, "late instance could not be disposed");
            }
            return Err(DiError::ObjectDisposed);
        }
        bag.push(disposer);
        Ok(value)
    }

    /// Flips the scope to disposed, returning what remains to be disposed,
    /// or `None` if it already was.
    fn begin_dispose(&self) -> Option<(Vec<Disposer>, Vec<Arc<ScopeInner>>)> {
        let entries = {
            let mut bag = self.disposables.lock();
            if self.disposed.swap(true, Ordering::AcqRel) {
                return None;
            }
            bag.take_reverse()
        };
        let children = self
            .children
            .lock()
            .drain(..)
            .rev()
            .filter_map(|child| child.upgrade())
            .collect();
        Some((entries, children))
    }

    pub(crate) fn dispose(&self) -> DiResult<()> {
        let Some((entries, children)) = self.begin_dispose() else {
            return Ok(());
        };

        let mut outcome = Ok(());
        for child in children {
            if let Err(e) = child.dispose() {
                outcome = outcome.and(Err(e));
            }
        }
        let count = entries.len();
        let own = dispose_bag::run_sync(entries);
        self.resolved.lock().clear();
        tracing::debug!(scope = self.id, disposed = count, "scope disposed");
        outcome.and(own)
    }

    pub(crate) fn dispose_async(&self) -> BoxFuture<'_> {
        Box::pin(async move {
            let Some((entries, children)) = self.begin_dispose() else {
                return;
            };
            for child in children {
                child.dispose_async().await;
            }
            let count = entries.len();
            dispose_bag::run_async(entries).await;
            self.resolved.lock().clear();
            tracing::debug!(scope = self.id, disposed = count, "scope disposed asynchronously");
        })
    }

    /// The provider handed to dependents of this scope, after substitution.
    pub(crate) fn provider_handle(self: &Arc<Self>) -> Arc<dyn ResolverCore> {
        let raw: Arc<dyn ResolverCore> = Arc::new(ScopeResolver(self.clone()));
        match &self.engine.provider_factory {
            Some(factory) if !substitution::is_substituting(self.id) => {
                substitution::substituting(self.id, || factory(raw))
            }
            _ => raw,
        }
    }

    pub(crate) fn scope_factory(self: &Arc<Self>) -> Arc<dyn ScopeFactory> {
        Arc::new(EngineScopeFactory(self.clone()))
    }

    pub(crate) fn disposable_count(&self) -> usize {
        self.disposables.lock().len()
    }
}

/// The engine's own provider for a scope, before substitution.
struct ScopeResolver(Arc<ScopeInner>);

impl ResolverCore for ScopeResolver {
    fn resolve_any(&self, key: &Key) -> DiResult<Option<AnyArc>> {
        self.0.resolve(&Request::One(key.clone()))
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.0.resolve_many(key)
    }
}

/// Creates children of the scope it was resolved from.
struct EngineScopeFactory(Arc<ScopeInner>);

impl ScopeFactory for EngineScopeFactory {
    fn create_scope(&self) -> DiResult<Box<dyn ServiceScope>> {
        let child = self.0.create_child()?;
        Ok(Box::new(Scope::new(child)))
    }
}

/// Scoped service container for request-scoped dependency resolution.
///
/// A `Scope` caches scoped services for its own lifetime while singletons
/// come from the root provider. Transients it resolves are owned by it, so
/// their disposal happens when the scope is disposed. Dropping the scope
/// disposes it.
///
/// # Lifetime Behavior
///
/// - **Singleton**: Resolved and cached in the root provider (shared across all scopes)
/// - **Scoped**: Resolved and cached within this specific scope
/// - **Transient**: Created fresh on every resolution and disposed with this scope
///
/// # Examples
///
/// ```
/// use resolvent::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct DatabaseConnection(String);
///
/// struct UserService {
///     db: Arc<DatabaseConnection>,
/// }
///
/// let mut collection = ServiceCollection::new();
///
/// // Scoped database connection per request
/// collection.add_scoped_factory(|_| Ok(DatabaseConnection("connection-123".to_string())));
///
/// // Transient user service that uses the scoped connection
/// collection.add_transient_factory(|resolver| {
///     Ok(UserService { db: resolver.get::<DatabaseConnection>()? })
/// });
///
/// let provider = collection.build().unwrap();
/// let scope = provider.create_scope().unwrap();
///
/// // Multiple services in the same scope share the same DB connection
/// let user1 = scope.get_required::<UserService>();
/// let user2 = scope.get_required::<UserService>();
/// assert!(Arc::ptr_eq(&user1.db, &user2.db));
/// ```
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    pub(crate) fn new(inner: Arc<ScopeInner>) -> Self {
        Self { inner }
    }

    /// Creates a nested scope. Disposing this scope disposes the child first.
    pub fn create_child_scope(&self) -> DiResult<Scope> {
        self.inner.create_child().map(Scope::new)
    }

    /// The provider of this scope as dependents see it.
    pub fn provider(&self) -> Arc<dyn ResolverCore> {
        self.inner.provider_handle()
    }

    /// Disposes child scopes, then every disposable this scope owns in
    /// reverse creation order. Disposing twice is a no-op.
    ///
    /// Fails with [`DiError::AsyncDisposalRequired`] if an owned service only
    /// supports asynchronous disposal; everything else is still disposed.
    pub fn dispose(&self) -> DiResult<()> {
        self.inner.dispose()
    }

    /// Disposes the scope, awaiting asynchronous disposers.
    pub async fn dispose_async(&self) {
        self.inner.dispose_async().await
    }

    /// Whether the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Number of instances awaiting disposal in this scope.
    pub fn disposable_count(&self) -> usize {
        self.inner.disposable_count()
    }
}

impl ResolverCore for Scope {
    fn resolve_any(&self, key: &Key) -> DiResult<Option<AnyArc>> {
        self.inner.lookup(key)
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.inner.lookup_many(key)
    }
}

impl ServiceScope for Scope {
    fn provider(&self) -> Arc<dyn ResolverCore> {
        Scope::provider(self)
    }

    fn dispose(&self) -> DiResult<()> {
        Scope::dispose(self)
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if let Err(e) = self.inner.dispose() {
            tracing::warn!(scope = self.inner.id, error = %e, "scope disposal on drop failed");
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("disposed", &self.inner.is_disposed())
            .finish()
    }
}
