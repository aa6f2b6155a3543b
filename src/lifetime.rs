//! Service lifetime definitions.

use std::fmt;

/// Service lifetimes controlling instance caching behavior
///
/// # Lifetime Characteristics
///
/// - **Singleton**: one instance per provider, cached in the root scope
/// - **Scoped**: one instance per scope, cached in the scope that requested it
/// - **Transient**: a fresh instance per request, never cached but still
///   tracked for disposal by the requesting scope
///
/// # Examples
///
/// ```rust
/// use resolvent::{Constructor, Injectable, ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database;
/// impl Injectable for Database {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new(vec![], |_| Ok(Database))]
///     }
/// }
///
/// struct Repository;
/// impl Injectable for Repository {
///     fn constructors() -> Vec<Constructor<Self>> {
///         vec![Constructor::new(vec![], |_| Ok(Repository))]
///     }
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton::<Database>();
/// services.add_scoped::<Repository>();
///
/// let provider = services.build().unwrap();
///
/// // Singleton: Same instance across scopes
/// let db1 = provider.get_required::<Database>();
/// let scope1 = provider.create_scope().unwrap();
/// let db2 = scope1.get_required::<Database>();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// // Scoped: Same within scope, different across scopes
/// let repo1a = scope1.get_required::<Repository>();
/// let repo1b = scope1.get_required::<Repository>();
/// assert!(Arc::ptr_eq(&repo1a, &repo1b));
///
/// let scope2 = provider.create_scope().unwrap();
/// let repo2 = scope2.get_required::<Repository>();
/// assert!(!Arc::ptr_eq(&repo1a, &repo2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Single instance per root provider, cached forever
    Singleton,
    /// Single instance per scope, cached for scope lifetime
    Scoped,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    /// Whether resolved values of this lifetime are stored in a scope's
    /// instance map.
    pub fn is_cached(self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Singleton => "Singleton",
            Lifetime::Scoped => "Scoped",
            Lifetime::Transient => "Transient",
        };
        f.write_str(name)
    }
}
