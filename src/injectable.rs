//! Constructor metadata for types the engine can activate itself.
//!
//! Rust has no runtime reflection, so a type opts into constructor injection
//! by implementing [`Injectable`] and describing its constructors: the ordered
//! [`Parameter`]s each one needs and a function that builds the value from the
//! resolved [`Args`]. The call-site builder uses this metadata the way a
//! reflection-based container inspects constructor signatures.

use std::any::Any;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{DiError, DiResult};
use crate::key::{key_of_generic, key_of_trait, key_of_type, provider_key, scope_factory_key, Key};
use crate::traits::{Disposer, ResolverCore, ScopeFactory};

/// Type-erased shared instance as stored by scopes.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// A type the engine can construct by resolving constructor parameters.
///
/// # Examples
///
/// ```rust
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
/// let mut services = ServiceCollection::new();
/// services.add_instance(Database { url: "postgres://localhost".to_string() });
/// services.add_transient::<UserService>();
///
/// let provider = services.build().unwrap();
/// let users = provider.get_required::<UserService>();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub trait Injectable: Send + Sync + Sized + 'static {
    /// The candidate constructors of this type.
    ///
    /// When several are declared, the engine picks the one with the most
    /// parameters among those whose parameters are all resolvable.
    fn constructors() -> Vec<Constructor<Self>>;

    /// Exposes the disposal capability of a freshly constructed instance.
    ///
    /// Types implementing [`Dispose`](crate::Dispose) or
    /// [`AsyncDispose`](crate::AsyncDispose) override this so the scope that
    /// created the instance disposes it.
    fn disposer(_this: &Arc<Self>) -> Option<Disposer> {
        None
    }
}

type BuildFn<T> = Arc<dyn Fn(&Args) -> DiResult<T> + Send + Sync>;
pub(crate) type InvokeFn = Arc<dyn Fn(&Args) -> DiResult<Instance> + Send + Sync>;

/// Function returning the erased constructors of a closed generic type.
pub type Specializer = fn() -> Vec<ErasedConstructor>;

/// One constructor of an [`Injectable`] type.
pub struct Constructor<T> {
    params: Vec<Parameter>,
    build: BuildFn<T>,
}

impl<T: Injectable> Constructor<T> {
    /// Declares a constructor taking `params`, in order.
    pub fn new<F>(params: Vec<Parameter>, build: F) -> Self
    where
        F: Fn(&Args) -> DiResult<T> + Send + Sync + 'static,
    {
        Self { params, build: Arc::new(build) }
    }

    /// The parameters of this constructor.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub(crate) fn erase(self) -> ErasedConstructor {
        let build = self.build;
        ErasedConstructor {
            params: self.params,
            invoke: Arc::new(move |args: &Args| -> DiResult<Instance> {
                let value = Arc::new(build(args)?);
                let disposer = T::disposer(&value);
                Ok(Instance { value, disposer })
            }),
        }
    }

    /// Erases the constructor while exposing the built value as trait object `S`.
    pub(crate) fn erase_as<S, C>(self, cast: C) -> ErasedConstructor
    where
        S: ?Sized + Send + Sync + 'static,
        C: Fn(Arc<T>) -> Arc<S> + Send + Sync + 'static,
    {
        let build = self.build;
        ErasedConstructor {
            params: self.params,
            invoke: Arc::new(move |args: &Args| -> DiResult<Instance> {
                let value = Arc::new(build(args)?);
                let disposer = T::disposer(&value);
                Ok(Instance { value: Arc::new(cast(value)), disposer })
            }),
        }
    }
}

/// A constructor with its result type erased.
#[derive(Clone)]
pub struct ErasedConstructor {
    pub(crate) params: Vec<Parameter>,
    pub(crate) invoke: InvokeFn,
}

/// Erased constructors of `T`; used as the specializer of closed generics.
pub fn specialize<T: Injectable>() -> Vec<ErasedConstructor> {
    T::constructors().into_iter().map(Constructor::erase).collect()
}

/// A freshly built value and, when it needs cleanup, its disposer.
pub struct Instance {
    pub(crate) value: AnyArc,
    pub(crate) disposer: Option<Disposer>,
}

impl Instance {
    /// An instance that needs no disposal.
    pub fn new(value: AnyArc) -> Self {
        Self { value, disposer: None }
    }

    /// An instance tracked for disposal by the scope that creates it.
    pub fn with_disposer(value: AnyArc, disposer: Disposer) -> Self {
        Self { value, disposer: Some(disposer) }
    }
}

#[derive(Clone, Debug)]
pub(crate) enum Dependency {
    One(Key),
    All(Key),
}

#[derive(Clone)]
pub(crate) enum Fallback {
    Required,
    Optional,
    Default(AnyArc),
}

/// A constructor parameter: the service it needs and what to do when that
/// service is not registered.
#[derive(Clone)]
pub struct Parameter {
    pub(crate) dependency: Dependency,
    pub(crate) fallback: Fallback,
}

impl Parameter {
    fn new(dependency: Dependency) -> Self {
        Self { dependency, fallback: Fallback::Required }
    }

    /// A concrete service of type `T`.
    pub fn of<T: Send + Sync + 'static>() -> Self {
        Self::new(Dependency::One(key_of_type::<T>()))
    }

    /// A trait-object service such as `dyn Logger`.
    pub fn of_trait<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self::new(Dependency::One(key_of_trait::<T>()))
    }

    /// A closed generic service, which may be served by an open-generic
    /// registration.
    pub fn of_generic<T: Injectable>() -> Self {
        Self::new(Dependency::One(key_of_generic::<T>()))
    }

    /// Every registration of `T`, in registration order. Never unresolvable.
    pub fn all<T: Send + Sync + 'static>() -> Self {
        Self::new(Dependency::All(key_of_type::<T>()))
    }

    /// Every registration of trait `T`, in registration order.
    pub fn all_traits<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self::new(Dependency::All(key_of_trait::<T>()))
    }

    /// The current provider, as vended by the provider substitution hook.
    pub fn provider() -> Self {
        Self::new(Dependency::One(provider_key()))
    }

    /// The scope factory of the current scope.
    pub fn scope_factory() -> Self {
        Self::new(Dependency::One(scope_factory_key()))
    }

    /// Resolves to nothing instead of failing when the service is missing.
    pub fn optional(mut self) -> Self {
        self.fallback = Fallback::Optional;
        self
    }

    /// Uses `value` when the service is missing.
    ///
    /// For trait parameters pass the `Arc<dyn Trait>` itself.
    pub fn or_default<V: Send + Sync + 'static>(mut self, value: V) -> Self {
        self.fallback = Fallback::Default(Arc::new(value));
        self
    }

    pub(crate) fn key(&self) -> &Key {
        match &self.dependency {
            Dependency::One(key) | Dependency::All(key) => key,
        }
    }
}

/// Resolved constructor arguments, positionally matching the declared
/// [`Parameter`]s.
pub struct Args {
    values: SmallVec<[Option<AnyArc>; 4]>,
}

impl Args {
    pub(crate) fn new(values: SmallVec<[Option<AnyArc>; 4]>) -> Self {
        Self { values }
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the constructor takes no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn raw(&self, index: usize) -> Option<&AnyArc> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// A concrete argument. Fails if an optional parameter was not resolved.
    pub fn get<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        self.get_optional(index)?
            .ok_or(DiError::NotFound(std::any::type_name::<T>()))
    }

    /// A concrete argument of an optional parameter.
    pub fn get_optional<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<T>>> {
        match self.raw(index) {
            None => Ok(None),
            Some(any) => any
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
        }
    }

    /// A trait-object argument.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        self.get_optional_trait(index)?
            .ok_or(DiError::NotFound(std::any::type_name::<T>()))
    }

    /// A trait-object argument of an optional parameter.
    pub fn get_optional_trait<T: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> DiResult<Option<Arc<T>>> {
        match self.raw(index) {
            None => Ok(None),
            Some(any) => downcast_trait::<T>(any).map(Some),
        }
    }

    /// All instances of an enumerable parameter declared with [`Parameter::all`].
    pub fn get_all<T: Send + Sync + 'static>(&self, index: usize) -> DiResult<Vec<Arc<T>>> {
        self.items(index)?
            .iter()
            .map(|any| {
                any.clone()
                    .downcast::<T>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
            })
            .collect()
    }

    /// All instances of an enumerable parameter declared with [`Parameter::all_traits`].
    pub fn get_all_traits<T: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> DiResult<Vec<Arc<T>>> {
        self.items(index)?.iter().map(downcast_trait::<T>).collect()
    }

    /// The provider argument of a parameter declared with [`Parameter::provider`].
    pub fn provider(&self, index: usize) -> DiResult<Arc<dyn ResolverCore>> {
        self.get_trait::<dyn ResolverCore>(index)
    }

    /// The scope factory argument of a parameter declared with
    /// [`Parameter::scope_factory`].
    pub fn scope_factory(&self, index: usize) -> DiResult<Arc<dyn ScopeFactory>> {
        self.get_trait::<dyn ScopeFactory>(index)
    }

    fn items(&self, index: usize) -> DiResult<Arc<Vec<AnyArc>>> {
        let any = self
            .raw(index)
            .ok_or(DiError::NotFound("enumerable argument"))?;
        any.clone()
            .downcast::<Vec<AnyArc>>()
            .map_err(|_| DiError::TypeMismatch("enumerable argument"))
    }
}

/// Trait objects are stored as `Arc<Arc<dyn Trait>>` inside the erased value.
pub(crate) fn downcast_trait<T: ?Sized + Send + Sync + 'static>(any: &AnyArc) -> DiResult<Arc<T>> {
    any.clone()
        .downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

/// Erases a trait object into the storage form used for trait services.
///
/// Custom [`ResolverCore`] implementations use this to return trait-object
/// services from `resolve_any`.
pub fn erase_trait<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
    Arc::new(value)
}
