//! # resolvent
//!
//! Call-site based dependency injection for Rust, inspired by Microsoft.Extensions.DependencyInjection.
//!
//! ## Features
//!
//! - **Validated object graphs**: every request is planned as a call-site graph before anything is built
//! - **Lifetimes**: Singleton, Scoped, and Transient services with captive-dependency detection
//! - **Constructor selection**: the constructor with the most satisfiable parameters wins
//! - **Enumerables and open generics**: resolve every registration, or specialize a generic definition
//! - **Pluggable execution**: interpret call sites, compile them, or start interpreting and compile hot paths
//! - **Ordered disposal**: instances are disposed in reverse creation order, sync or async
//!
//! ## Quick Start
//!
//! ```rust
//! use resolvent::{Constructor, Injectable, Parameter, ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! impl Injectable for UserService {
//!     fn constructors() -> Vec<Constructor<Self>> {
//!         vec![Constructor::new(vec![Parameter::of::<Database>()], |args| {
//!             Ok(UserService { db: args.get(0)? })
//!         })]
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_instance(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! services.add_transient::<UserService>();
//!
//! let provider = services.build().unwrap();
//! let user_service = provider.get_required::<UserService>();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: Created once and shared across the entire provider
//! - **Scoped**: Created once per scope (ideal for web request contexts)
//! - **Transient**: Created fresh on every resolution
//!
//! ## Execution Modes
//!
//! ```rust
//! use resolvent::{ProviderOptions, ServiceCollection, ServiceProviderMode, Resolver};
//!
//! let mut services = ServiceCollection::new();
//! services.add_transient_factory(|_| Ok(String::from("hello")));
//!
//! for mode in ServiceProviderMode::ALL {
//!     let provider = services
//!         .build_with_options(ProviderOptions::default().mode(mode))
//!         .unwrap();
//!     assert_eq!(*provider.get_required::<String>(), "hello");
//! }
//! ```
//!
//! ## Provider Substitution
//!
//! A provider factory can wrap the provider that services receive when they
//! depend on the provider itself; resolution results are unchanged.
//!
//! ```rust
//! use resolvent::{Key, AnyArc, DiResult, ProviderOptions, ResolverCore, ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! struct Delegating(Arc<dyn ResolverCore>);
//!
//! impl ResolverCore for Delegating {
//!     fn resolve_any(&self, key: &Key) -> DiResult<Option<AnyArc>> {
//!         self.0.resolve_any(key)
//!     }
//!     fn resolve_many(&self, key: &Key) -> DiResult<Vec<AnyArc>> {
//!         self.0.resolve_many(key)
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_instance(7u8);
//!
//! let options = ProviderOptions::default()
//!     .provider_factory(|inner| Arc::new(Delegating(inner)) as Arc<dyn ResolverCore>);
//! let provider = services.build_with_options(options).unwrap();
//!
//! let handle = provider.get_provider().unwrap();
//! assert_eq!(*handle.get_required::<u8>(), 7);
//! ```

// Module declarations
pub mod collection;
pub mod descriptors;
pub mod error;
pub mod injectable;
pub mod key;
pub mod lifetime;
pub mod options;
pub mod provider;
pub mod traits;

// Internal modules
mod call_site;
mod engine;
mod internal;
mod registration;

// Re-export core types
pub use collection::ServiceCollection;
pub use descriptors::{ImplementationKind, ServiceDescriptor};
pub use error::{DiError, DiResult};
pub use injectable::{
    erase_trait, specialize, AnyArc, Args, Constructor, ErasedConstructor, Injectable, Instance,
    Parameter, Specializer,
};
pub use key::{key_of_generic, key_of_trait, key_of_type, provider_key, scope_factory_key, Key};
pub use lifetime::Lifetime;
pub use options::{ParseModeError, ProviderFactory, ProviderOptions, ServiceProviderMode};
pub use provider::{ResolverContext, Scope, ServiceProvider};
pub use traits::{AsyncDispose, Dispose, Disposer, Resolver, ResolverCore, ScopeFactory, ServiceScope};
