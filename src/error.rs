//! Error types for the dependency injection engine.

use std::error::Error;
use std::sync::Arc;

use thiserror::Error;

/// Dependency injection errors
///
/// Every failure is reported synchronously from the `get*`/`resolve` call that
/// triggered it. Graph-level failures ([`Unresolvable`](DiError::Unresolvable),
/// [`Circular`](DiError::Circular), [`CaptiveDependency`](DiError::CaptiveDependency),
/// [`AmbiguousConstructor`](DiError::AmbiguousConstructor)) are detected before any
/// instance is constructed.
///
/// # Examples
///
/// ```rust
/// use resolvent::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build().unwrap();
/// match provider.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
///
/// let circular = DiError::Circular(vec!["ServiceA", "ServiceB", "ServiceA"]);
/// assert_eq!(circular.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    /// Service not registered
    #[error("Service not found: {0}")]
    NotFound(&'static str),
    /// Type downcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(&'static str),
    /// A required constructor parameter has no registration and no default
    #[error("Unable to resolve service for type '{service}' while attempting to activate '{}'", .chain.join(" -> "))]
    Unresolvable {
        /// The missing service
        service: &'static str,
        /// Implementations being activated, outermost first
        chain: Vec<&'static str>,
    },
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<&'static str>),
    /// A singleton depends, directly or through transients, on a scoped service
    #[error("Cannot consume scoped service '{scoped}' from singleton '{singleton}'")]
    CaptiveDependency {
        /// The longer-lived consumer
        singleton: &'static str,
        /// The scoped dependency it would capture
        scoped: &'static str,
    },
    /// A scoped service was requested from the root provider
    #[error("Cannot resolve '{service}' from root provider because it requires scoped service '{scoped}'")]
    ScopedFromRoot {
        /// The requested service
        service: &'static str,
        /// The scoped service it requires
        scoped: &'static str,
    },
    /// More than one constructor of equal arity is satisfiable
    #[error("Unable to activate '{0}': multiple constructors accept all given argument types")]
    AmbiguousConstructor(&'static str),
    /// An injectable type declared no constructors
    #[error("No constructor declared for '{0}'")]
    NoConstructor(&'static str),
    /// The scope (or provider) has already been disposed
    #[error("Cannot access a disposed scope")]
    ObjectDisposed,
    /// A service only implements asynchronous disposal
    #[error("'{0}' only supports asynchronous disposal; use dispose_async()")]
    AsyncDisposalRequired(&'static str),
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// A user constructor or factory failed
    #[error("{0}")]
    Construction(#[source] Arc<dyn Error + Send + Sync>),
}

impl DiError {
    /// Wraps an error raised by a user constructor or factory.
    ///
    /// The original error is kept as-is and can be recovered with
    /// [`construction_error`](Self::construction_error).
    pub fn construction<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        DiError::Construction(Arc::new(error))
    }

    /// Returns the user error carried by a [`DiError::Construction`].
    ///
    /// ```rust
    /// use resolvent::DiError;
    ///
    /// #[derive(Debug, thiserror::Error)]
    /// #[error("connection refused")]
    /// struct ConnectError;
    ///
    /// let err = DiError::construction(ConnectError);
    /// assert!(err.construction_error().unwrap().downcast_ref::<ConnectError>().is_some());
    /// ```
    pub fn construction_error(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            DiError::Construction(inner) => Some(&**inner),
            _ => None,
        }
    }
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
