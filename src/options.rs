//! Provider configuration: execution mode, validation and substitution.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::traits::ResolverCore;

/// Replaces the provider handed to dependents with a caller-supplied one.
///
/// Receives the engine's own provider for a scope and returns the provider
/// that services depending on "the current provider", factories and scope
/// factory lookups will see.
pub type ProviderFactory = Arc<dyn Fn(Arc<dyn ResolverCore>) -> Arc<dyn ResolverCore> + Send + Sync>;

/// Strategy used to execute call-site graphs.
///
/// Every mode resolves the same object graphs with the same disposal order;
/// they differ in startup cost and steady-state throughput.
///
/// ```rust
/// use resolvent::ServiceProviderMode;
///
/// let mode: ServiceProviderMode = "codegen".parse().unwrap();
/// assert_eq!(mode, ServiceProviderMode::CodeGen);
/// assert_eq!(mode.to_string(), "codegen");
/// assert!("jit".parse::<ServiceProviderMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ServiceProviderMode {
    /// Interpreted graph walk, with every registration validated when the
    /// provider is built
    #[default]
    Default,
    /// Adaptive execution promoting hot roots to generated programs
    Dynamic,
    /// Interpreted graph walk, validated lazily per requested root
    Runtime,
    /// Graphs compiled into nested closures on first use
    Expressions,
    /// Graphs lowered into flat register programs on first use
    CodeGen,
}

impl ServiceProviderMode {
    /// Every mode, in declaration order.
    pub const ALL: [ServiceProviderMode; 5] = [
        ServiceProviderMode::Default,
        ServiceProviderMode::Dynamic,
        ServiceProviderMode::Runtime,
        ServiceProviderMode::Expressions,
        ServiceProviderMode::CodeGen,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            ServiceProviderMode::Default => "default",
            ServiceProviderMode::Dynamic => "dynamic",
            ServiceProviderMode::Runtime => "runtime",
            ServiceProviderMode::Expressions => "expressions",
            ServiceProviderMode::CodeGen => "codegen",
        }
    }
}

impl fmt::Display for ServiceProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown execution mode name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown service provider mode '{0}'")]
pub struct ParseModeError(String);

impl FromStr for ServiceProviderMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ServiceProviderMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| ParseModeError(s.to_string()))
    }
}

/// Options for [`ServiceCollection::build_with_options`](crate::ServiceCollection::build_with_options).
///
/// # Examples
///
/// ```rust
/// use resolvent::{ProviderOptions, ServiceCollection, ServiceProviderMode};
///
/// let options = ProviderOptions::new()
///     .mode(ServiceProviderMode::CodeGen)
///     .validate_scopes(true);
///
/// let provider = ServiceCollection::new().build_with_options(options).unwrap();
/// assert_eq!(provider.mode(), ServiceProviderMode::CodeGen);
/// ```
#[derive(Clone)]
pub struct ProviderOptions {
    pub(crate) mode: ServiceProviderMode,
    pub(crate) validate_scopes: bool,
    pub(crate) validate_on_build: Option<bool>,
    pub(crate) compile_threshold: usize,
    pub(crate) provider_factory: Option<ProviderFactory>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            mode: ServiceProviderMode::Default,
            validate_scopes: false,
            validate_on_build: None,
            compile_threshold: 2,
            provider_factory: None,
        }
    }
}

impl ProviderOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the execution strategy.
    pub fn mode(mut self, mode: ServiceProviderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Turns captive dependencies and scoped resolution from the root
    /// provider into errors.
    pub fn validate_scopes(mut self, enabled: bool) -> Self {
        self.validate_scopes = enabled;
        self
    }

    /// Validates every registration while building the provider.
    ///
    /// Defaults to on for [`ServiceProviderMode::Default`] and off otherwise.
    pub fn validate_on_build(mut self, enabled: bool) -> Self {
        self.validate_on_build = Some(enabled);
        self
    }

    /// Number of calls after which an adaptive mode compiles a root.
    pub fn compile_threshold(mut self, calls: usize) -> Self {
        self.compile_threshold = calls.max(1);
        self
    }

    /// Installs the provider substitution hook.
    pub fn provider_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(Arc<dyn ResolverCore>) -> Arc<dyn ResolverCore> + Send + Sync + 'static,
    {
        self.provider_factory = Some(Arc::new(factory));
        self
    }

    pub(crate) fn eager_validation(&self) -> bool {
        self.validate_on_build
            .unwrap_or(self.mode == ServiceProviderMode::Default)
    }
}

impl fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("mode", &self.mode)
            .field("validate_scopes", &self.validate_scopes)
            .field("validate_on_build", &self.eager_validation())
            .field("compile_threshold", &self.compile_threshold)
            .field("provider_factory", &self.provider_factory.is_some())
            .finish()
    }
}
