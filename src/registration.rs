//! Descriptor registry: ordered registrations indexed by service key.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::descriptors::{Implementation, ServiceDescriptor};
use crate::key::Key;

/// A descriptor chosen for a request, with its cache slot.
///
/// Slot 0 belongs to the last matching registration; enumerable item `i` of
/// `n` matches has slot `n - 1 - i`, so single and enumerable resolution of
/// the same registration share one cached instance.
#[derive(Clone, Copy)]
pub(crate) struct Match<'a> {
    pub(crate) descriptor: &'a ServiceDescriptor,
    pub(crate) slot: usize,
}

/// Immutable snapshot of the service collection used by a provider.
pub(crate) struct Registry {
    descriptors: Vec<ServiceDescriptor>,
    exact: HashMap<Key, SmallVec<[usize; 2]>>,
    open: HashMap<&'static str, SmallVec<[usize; 2]>>,
}

impl Registry {
    pub(crate) fn new(descriptors: Vec<ServiceDescriptor>) -> Self {
        let mut exact: HashMap<Key, SmallVec<[usize; 2]>> = HashMap::new();
        let mut open: HashMap<&'static str, SmallVec<[usize; 2]>> = HashMap::new();

        for (index, descriptor) in descriptors.iter().enumerate() {
            match &descriptor.implementation {
                Implementation::OpenGeneric { definition } => {
                    open.entry(*definition).or_default().push(index)
                }
                _ => exact.entry(descriptor.key.clone()).or_default().push(index),
            }
        }

        Self { descriptors, exact, open }
    }

    /// Indices of every registration whose service matches `key`.
    ///
    /// Open generics of the key's definition are included even when the key
    /// cannot specialize them, so slot numbering does not depend on how the
    /// request was made.
    fn indices(&self, key: &Key) -> SmallVec<[usize; 4]> {
        let mut indices: SmallVec<[usize; 4]> = self
            .exact
            .get(key)
            .map(|found| found.iter().copied().collect())
            .unwrap_or_default();

        if !matches!(key, Key::Trait(_)) {
            if let Some(found) = key.generic_definition().and_then(|def| self.open.get(def)) {
                indices.extend(found.iter().copied());
                indices.sort_unstable();
            }
        }
        indices
    }

    fn is_open(&self, index: usize) -> bool {
        matches!(self.descriptors[index].implementation, Implementation::OpenGeneric { .. })
    }

    /// Every registration able to serve `key`, in registration order.
    pub(crate) fn matches(&self, key: &Key) -> SmallVec<[Match<'_>; 4]> {
        let indices = self.indices(key);
        let n = indices.len();
        let specializable = key.specializer().is_some();
        indices
            .iter()
            .enumerate()
            .filter(|&(_, &index)| specializable || !self.is_open(index))
            .map(|(i, &index)| Match { descriptor: &self.descriptors[index], slot: n - 1 - i })
            .collect()
    }

    /// The registration serving a single request for `key`.
    ///
    /// The last exact registration wins; an open generic is only used when no
    /// exact registration exists.
    pub(crate) fn single(&self, key: &Key) -> Option<Match<'_>> {
        let all = self.matches(key);
        all.iter()
            .rev()
            .find(|m| !matches!(m.descriptor.implementation, Implementation::OpenGeneric { .. }))
            .or_else(|| all.last())
            .copied()
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        !self.matches(key).is_empty()
    }

    /// Distinct closed service keys in first-registration order.
    pub(crate) fn closed_keys(&self) -> Vec<Key> {
        let mut seen = std::collections::HashSet::new();
        self.descriptors
            .iter()
            .filter(|d| !matches!(d.implementation, Implementation::OpenGeneric { .. }))
            .filter(|d| seen.insert(d.key.clone()))
            .map(|d| d.key.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.descriptors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injectable::{AnyArc, Constructor, Injectable};
    use crate::key::{key_of_generic, key_of_type};
    use crate::lifetime::Lifetime;
    use std::sync::Arc;

    struct Repo<T>(std::marker::PhantomData<T>);

    impl<T: Send + Sync + 'static> Injectable for Repo<T> {
        fn constructors() -> Vec<Constructor<Self>> {
            vec![Constructor::new(vec![], |_| Ok(Repo(std::marker::PhantomData)))]
        }
    }

    fn instance<T: Send + Sync + 'static>(value: T) -> ServiceDescriptor {
        ServiceDescriptor::new(
            key_of_type::<T>(),
            Lifetime::Singleton,
            Implementation::Instance(Arc::new(value) as AnyArc),
        )
    }

    fn open_repo() -> ServiceDescriptor {
        ServiceDescriptor::new(
            key_of_type::<Repo<()>>(),
            Lifetime::Scoped,
            Implementation::OpenGeneric {
                definition: crate::key::generic_definition(std::any::type_name::<Repo<()>>())
                    .unwrap_or_default(),
            },
        )
    }

    #[test]
    fn test_slots_count_from_the_last_registration() {
        let registry = Registry::new(vec![instance(1u32), instance("x"), instance(2u32), instance(3u32)]);
        let all = registry.matches(&key_of_type::<u32>());
        let slots: Vec<usize> = all.iter().map(|m| m.slot).collect();
        assert_eq!(slots, vec![2, 1, 0]);

        let single = registry.single(&key_of_type::<u32>()).unwrap();
        assert_eq!(single.slot, 0);
        assert!(std::ptr::eq(single.descriptor, all[2].descriptor));
    }

    #[test]
    fn test_exact_registration_beats_later_open_generic() {
        let exact = ServiceDescriptor::new(
            key_of_type::<Repo<u8>>(),
            Lifetime::Transient,
            Implementation::Instance(Arc::new(Repo::<u8>(std::marker::PhantomData)) as AnyArc),
        );
        let registry = Registry::new(vec![exact, open_repo()]);

        let key = key_of_generic::<Repo<u8>>();
        assert_eq!(registry.matches(&key).len(), 2);
        let single = registry.single(&key).unwrap();
        assert_eq!(single.descriptor.lifetime, Lifetime::Transient);
        assert_eq!(single.slot, 1);

        // A plain type request sees the same slot for the exact registration.
        let plain = registry.single(&key_of_type::<Repo<u8>>()).unwrap();
        assert_eq!(plain.slot, 1);
        assert_eq!(registry.matches(&key_of_type::<Repo<u8>>()).len(), 1);
    }

    #[test]
    fn test_open_generic_requires_specializer() {
        let registry = Registry::new(vec![open_repo()]);
        assert!(registry.contains(&key_of_generic::<Repo<u16>>()));
        assert_eq!(registry.matches(&key_of_generic::<Repo<u16>>())[0].slot, 0);
        assert!(!registry.contains(&key_of_type::<Repo<u16>>()));
        assert!(registry.closed_keys().is_empty());
    }
}
