//! Resolver context for factory functions.

use std::sync::Arc;

use crate::error::DiResult;
use crate::injectable::AnyArc;
use crate::key::Key;
use crate::traits::ResolverCore;

/// Context passed to factory functions for resolving dependencies.
///
/// Wraps the provider of the scope that owns the instance being created:
/// the root scope for singletons, the requesting scope otherwise. When a
/// provider factory is configured this is the substituted provider.
///
/// # Examples
///
/// ```
/// use resolvent::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_instance(Database {
///     url: "postgres://localhost".to_string()
/// });
/// services.add_transient_factory(|resolver| {
///     // resolver is a ResolverContext that provides access to other services
///     Ok(UserService {
///         db: resolver.get::<Database>()?,
///     })
/// });
///
/// let provider = services.build().unwrap();
/// assert_eq!(provider.get_required::<UserService>().db.url, "postgres://localhost");
/// ```
pub struct ResolverContext {
    provider: Arc<dyn ResolverCore>,
}

impl ResolverContext {
    pub(crate) fn new(provider: Arc<dyn ResolverCore>) -> Self {
        Self { provider }
    }

    /// The provider this context resolves from.
    pub fn provider(&self) -> Arc<dyn ResolverCore> {
        self.provider.clone()
    }
}

impl ResolverCore for ResolverContext {
    fn resolve_any(&self, key: &Key) -> DiResult<Option<AnyArc>> {
        self.provider.resolve_any(key)
    }

    fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
        self.provider.resolve_many(key)
    }
}
