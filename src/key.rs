//! Service key types for the dependency injection engine.

use std::any::TypeId;
use std::hash::{Hash, Hasher};

use crate::injectable::{specialize, Injectable, Specializer};
use crate::traits::{ResolverCore, ScopeFactory};

/// Key for service storage and lookup.
///
/// # Key Types
///
/// - **Type**: concrete types (structs, enums, primitives)
/// - **Trait**: trait-object services such as `dyn Logger`
/// - **Generic**: a closed generic type that carries its own constructor
///   specializer, so it can be served by an open-generic registration
///
/// A `Generic` key compares and hashes exactly like the `Type` key of the same
/// type; the specializer only matters when no exact registration exists.
///
/// # Examples
///
/// ```rust
/// use resolvent::{key_of_type, key_of_trait, Key};
///
/// trait Logger: Send + Sync {}
///
/// let number = key_of_type::<u32>();
/// assert_eq!(number.display_name(), "u32");
///
/// let logger = key_of_trait::<dyn Logger>();
/// assert!(matches!(logger, Key::Trait(_)));
/// ```
#[derive(Debug, Clone)]
pub enum Key {
    /// Concrete type key with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Trait-object key, identified by the trait object's type name
    Trait(&'static str),
    /// Closed generic type key able to specialize an open-generic registration
    Generic(TypeId, &'static str, Specializer),
}

impl Key {
    /// Get the type or trait name for display
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) | Key::Generic(_, name, _) => name,
            Key::Trait(name) => name,
        }
    }

    /// The specializer carried by a closed generic request.
    pub(crate) fn specializer(&self) -> Option<Specializer> {
        match self {
            Key::Generic(_, _, specializer) => Some(*specializer),
            _ => None,
        }
    }

    /// The generic type definition this key instantiates, if any.
    ///
    /// ```rust
    /// use resolvent::key_of_type;
    ///
    /// struct Repository<T>(T);
    ///
    /// let key = key_of_type::<Repository<u8>>();
    /// assert!(key.generic_definition().unwrap().ends_with("Repository"));
    /// assert_eq!(key_of_type::<u8>().generic_definition(), None);
    /// ```
    pub fn generic_definition(&self) -> Option<&'static str> {
        generic_definition(self.display_name())
    }

    /// Whether this key names the provider abstraction (`dyn ResolverCore`).
    pub fn is_provider(&self) -> bool {
        matches!(self, Key::Trait(name) if *name == std::any::type_name::<dyn ResolverCore>())
    }

    /// Whether this key names the scope factory abstraction (`dyn ScopeFactory`).
    pub fn is_scope_factory(&self) -> bool {
        matches!(self, Key::Trait(name) if *name == std::any::type_name::<dyn ScopeFactory>())
    }
}

impl PartialEq for Key {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Key::Type(a, _) | Key::Generic(a, _, _),
                Key::Type(b, _) | Key::Generic(b, _, _),
            ) => a == b,
            (Key::Trait(a), Key::Trait(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            // Type and Generic must agree so either form finds the same entry
            Key::Type(id, _) | Key::Generic(id, _, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Trait(name) => {
                1u8.hash(state);
                name.hash(state);
            }
        }
    }
}

/// Strips the generic argument list from a type name.
pub(crate) fn generic_definition(name: &'static str) -> Option<&'static str> {
    name.find('<').map(|pos| &name[..pos])
}

/// Key of a concrete type.
#[inline]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

/// Key of a trait-object service such as `dyn Logger`.
#[inline]
pub fn key_of_trait<T: ?Sized + 'static>() -> Key {
    Key::Trait(std::any::type_name::<T>())
}

/// Key of a closed generic type that can be served by an open-generic
/// registration of its definition.
#[inline]
pub fn key_of_generic<T: Injectable>() -> Key {
    Key::Generic(TypeId::of::<T>(), std::any::type_name::<T>(), specialize::<T>)
}

/// Key of the provider abstraction itself.
pub fn provider_key() -> Key {
    key_of_trait::<dyn ResolverCore>()
}

/// Key of the scope factory abstraction.
pub fn scope_factory_key() -> Key {
    key_of_trait::<dyn ScopeFactory>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Wrapper<T>(#[allow(dead_code)] T);

    #[test]
    fn test_generic_key_equals_type_key() {
        use crate::injectable::{Constructor, Injectable};

        struct Repo<T>(std::marker::PhantomData<T>);
        impl<T: Send + Sync + 'static> Injectable for Repo<T> {
            fn constructors() -> Vec<Constructor<Self>> {
                vec![Constructor::new(vec![], |_| Ok(Repo(std::marker::PhantomData)))]
            }
        }

        let mut set = HashSet::new();
        set.insert(key_of_type::<Repo<u8>>());
        assert!(set.contains(&key_of_generic::<Repo<u8>>()));
        assert!(!set.contains(&key_of_generic::<Repo<u16>>()));
    }

    #[test]
    fn test_generic_definition_strips_arguments() {
        let name = std::any::type_name::<Wrapper<Wrapper<u8>>>();
        let def = generic_definition(name).unwrap();
        assert!(def.ends_with("Wrapper"));
        assert!(!def.contains('<'));
    }

    #[test]
    fn test_provider_and_scope_factory_keys() {
        assert!(provider_key().is_provider());
        assert!(!provider_key().is_scope_factory());
        assert!(scope_factory_key().is_scope_factory());
        assert!(!key_of_type::<u8>().is_provider());
    }

    #[test]
    fn test_trait_and_type_keys_differ() {
        trait Marker {}
        assert_ne!(key_of_trait::<dyn Marker>(), key_of_type::<u8>());
    }
}
