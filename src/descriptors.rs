//! Service descriptors: what each registration provides and how.

use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::injectable::{AnyArc, ErasedConstructor, Instance};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;

/// Type-erased factory delegate.
pub(crate) type FactoryFn = Arc<dyn Fn(&ResolverContext) -> DiResult<Instance> + Send + Sync>;

/// How a registration produces its instance.
#[derive(Clone)]
pub(crate) enum Implementation {
    /// An [`Injectable`](crate::Injectable) type activated through one of its constructors.
    Constructors {
        name: &'static str,
        constructors: Vec<ErasedConstructor>,
    },
    /// A user delegate receiving the current provider.
    Factory(FactoryFn),
    /// A pre-built value.
    Instance(AnyArc),
    /// An open generic definition, specialized per closed request.
    OpenGeneric { definition: &'static str },
}

/// Kind of implementation behind a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationKind {
    /// Activated through a declared constructor
    Type,
    /// Produced by a factory delegate
    Factory,
    /// Registered as a ready instance
    Instance,
    /// Open generic definition
    OpenGeneric,
}

/// Service descriptor for introspection and diagnostics
///
/// Pairs a service key with a lifetime and an implementation. Descriptors are
/// kept in registration order; for a given key the last one wins single
/// resolution while enumerable resolution returns all of them.
///
/// # Examples
///
/// ```rust
/// use resolvent::{ImplementationKind, Lifetime, ServiceCollection};
///
/// struct Database { url: String }
/// struct Repository { name: String }
///
/// let mut services = ServiceCollection::new();
/// services.add_instance(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory(|_| Ok(Repository { name: "UserRepo".to_string() }));
///
/// let descriptors = services.descriptors();
/// assert_eq!(descriptors.len(), 2);
///
/// let repo = descriptors.iter()
///     .find(|d| d.type_name().contains("Repository"))
///     .unwrap();
/// assert_eq!(repo.lifetime, Lifetime::Scoped);
/// assert_eq!(repo.kind(), ImplementationKind::Factory);
/// ```
#[derive(Clone)]
pub struct ServiceDescriptor {
    /// The service key
    pub key: Key,
    /// Service lifetime
    pub lifetime: Lifetime,
    pub(crate) implementation: Implementation,
}

impl ServiceDescriptor {
    pub(crate) fn new(key: Key, lifetime: Lifetime, implementation: Implementation) -> Self {
        Self { key, lifetime, implementation }
    }

    /// Get the type/trait name of the service
    pub fn type_name(&self) -> &'static str {
        self.key.display_name()
    }

    /// Name of the implementation type, when the descriptor activates one.
    pub fn implementation_name(&self) -> Option<&'static str> {
        match &self.implementation {
            Implementation::Constructors { name, .. } => Some(*name),
            Implementation::OpenGeneric { definition } => Some(*definition),
            Implementation::Factory(_) | Implementation::Instance(_) => None,
        }
    }

    /// Kind of implementation behind this descriptor.
    pub fn kind(&self) -> ImplementationKind {
        match &self.implementation {
            Implementation::Constructors { .. } => ImplementationKind::Type,
            Implementation::Factory(_) => ImplementationKind::Factory,
            Implementation::Instance(_) => ImplementationKind::Instance,
            Implementation::OpenGeneric { .. } => ImplementationKind::OpenGeneric,
        }
    }

    /// Whether this descriptor can serve `key`, possibly after specializing
    /// an open generic definition.
    pub fn provides(&self, key: &Key) -> bool {
        match &self.implementation {
            Implementation::OpenGeneric { definition } => {
                !matches!(key, Key::Trait(_)) && key.generic_definition() == Some(*definition)
            }
            _ => self.key == *key,
        }
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("service", &self.type_name())
            .field("lifetime", &self.lifetime)
            .field("kind", &self.kind())
            .field("implementation", &self.implementation_name())
            .finish()
    }
}
