//! Disposal traits for resource cleanup.

use std::fmt;
use std::sync::Arc;

/// Trait for synchronous resource disposal.
///
/// Implement this trait for services that need structured teardown (e.g., flushing caches,
/// closing connections). The scope that created an instance disposes it, in
/// reverse order of creation, when the scope itself is disposed.
///
/// # Examples
///
/// ```
/// use resolvent::{Constructor, Dispose, Disposer, Injectable, ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Cache;
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         println!("Flushing cache");
///     }
/// }
///
/// impl Injectable for Cache {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new(vec![], |_| Ok(Cache))]
///     }
///
///     fn disposer(this: &Arc<Self>) -> Option<Disposer> {
///         Some(Disposer::sync(this.clone()))
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped::<Cache>();
/// let provider = services.build().unwrap();
///
/// let scope = provider.create_scope().unwrap();
/// let _cache = scope.get_required::<Cache>();
/// scope.dispose().unwrap(); // prints "Flushing cache"
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Trait for asynchronous resource disposal.
///
/// Scopes holding async-only disposables must be disposed with
/// `dispose_async().await`.
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}

#[derive(Clone)]
pub(crate) enum DisposerKind {
    Sync(Arc<dyn Dispose>),
    Async(Arc<dyn AsyncDispose>),
}

/// Disposal handle for an instance owned by a scope.
#[derive(Clone)]
pub struct Disposer {
    pub(crate) name: &'static str,
    pub(crate) kind: DisposerKind,
}

impl Disposer {
    /// Disposes `service` synchronously.
    pub fn sync<T: Dispose>(service: Arc<T>) -> Self {
        Self {
            name: std::any::type_name::<T>(),
            kind: DisposerKind::Sync(service),
        }
    }

    /// Disposes `service` asynchronously.
    pub fn asynchronous<T: AsyncDispose>(service: Arc<T>) -> Self {
        Self {
            name: std::any::type_name::<T>(),
            kind: DisposerKind::Async(service),
        }
    }

    /// Name of the disposed type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DisposerKind::Sync(_) => "sync",
            DisposerKind::Async(_) => "async",
        };
        f.debug_struct("Disposer")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}
