//! Core traits for the dependency injection engine.

mod dispose;
mod resolver;

pub use dispose::{AsyncDispose, Dispose, Disposer};
pub(crate) use dispose::DisposerKind;
pub use resolver::{Resolver, ResolverCore, ScopeFactory, ServiceScope};
