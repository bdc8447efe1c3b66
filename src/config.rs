//! Engine configuration.
//!
//! Built once with chained `with_*` calls, then shared by reference with
//! every evaluation. Nothing here is mutated while templates render.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builtins;
use crate::formatter::{
    FormatterCall, FormatterRegistry, FormatterSignature, NumberConverter, ToStringConverter,
    ValueConverter,
};
use crate::evaluator::EvalError;
use crate::resolver::{Introspector, SerdeIntrospector, TypeDescriptor, ValueResolver};
use crate::value::Value;

pub const DEFAULT_MAX_DEPTH: usize = 256;

/// What happens to recoverable evaluation failures: unresolved paths and
/// formatter calls no candidate accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Log the failure and continue with null.
    #[default]
    Recover,
    /// Fail the evaluation.
    Strict,
}

/// A path segment that nothing could resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedPath {
    /// Key path of the context the lookup started from.
    pub path: String,
    pub key: String,
    pub type_name: String,
}

type FalsyFn = dyn Fn(&Value) -> bool + Send + Sync;
type UnresolvedHook = dyn Fn(&UnresolvedPath) + Send + Sync;

#[derive(Clone)]
pub struct EngineConfig {
    formatters: FormatterRegistry,
    resolvers: Vec<Arc<dyn ValueResolver>>,
    descriptors: HashMap<String, TypeDescriptor>,
    introspector: Arc<dyn Introspector>,
    converters: Vec<Arc<dyn ValueConverter>>,
    falsy: Arc<FalsyFn>,
    on_unresolved: Arc<UnresolvedHook>,
    policy: ErrorPolicy,
    max_depth: usize,
}

impl Default for EngineConfig {
    /// The built-in formatters, the serde introspector and the string and
    /// number converters.
    fn default() -> Self {
        let mut formatters = FormatterRegistry::new();
        builtins::register(&mut formatters);
        EngineConfig {
            formatters,
            ..Self::empty()
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// No formatters registered; resolution and conversion defaults only.
    pub fn empty() -> Self {
        EngineConfig {
            formatters: FormatterRegistry::new(),
            resolvers: Vec::new(),
            descriptors: HashMap::new(),
            introspector: Arc::new(SerdeIntrospector),
            converters: vec![Arc::new(ToStringConverter), Arc::new(NumberConverter)],
            falsy: Arc::new(Value::is_falsy),
            on_unresolved: Arc::new(|unresolved: &UnresolvedPath| {
                tracing::debug!(
                    path = %unresolved.path,
                    key = %unresolved.key,
                    type_name = %unresolved.type_name,
                    "unresolved path"
                );
            }),
            policy: ErrorPolicy::Recover,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_formatter<F>(
        mut self,
        name: impl Into<String>,
        signature: FormatterSignature,
        function: F,
    ) -> Self
    where
        F: Fn(&mut FormatterCall<'_, '_, '_>) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.formatters.register(name, signature, function);
        self
    }

    pub fn with_resolver(mut self, resolver: impl ValueResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    pub fn with_type_descriptor(mut self, descriptor: TypeDescriptor) -> Self {
        self.descriptors
            .insert(descriptor.type_name().to_string(), descriptor);
        self
    }

    pub fn with_introspector(mut self, introspector: impl Introspector + 'static) -> Self {
        self.introspector = Arc::new(introspector);
        self
    }

    pub fn with_converter(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.converters.push(Arc::new(converter));
        self
    }

    pub fn with_falsy(mut self, falsy: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.falsy = Arc::new(falsy);
        self
    }

    pub fn with_unresolved_hook(
        mut self,
        hook: impl Fn(&UnresolvedPath) + Send + Sync + 'static,
    ) -> Self {
        self.on_unresolved = Arc::new(hook);
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn strict(self) -> Self {
        self.with_error_policy(ErrorPolicy::Strict)
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn formatters(&self) -> &FormatterRegistry {
        &self.formatters
    }

    pub fn formatters_mut(&mut self) -> &mut FormatterRegistry {
        &mut self.formatters
    }

    pub fn resolvers(&self) -> &[Arc<dyn ValueResolver>] {
        &self.resolvers
    }

    pub fn descriptor(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.descriptors.get(type_name)
    }

    pub fn introspector(&self) -> &dyn Introspector {
        self.introspector.as_ref()
    }

    pub fn converters(&self) -> &[Arc<dyn ValueConverter>] {
        &self.converters
    }

    pub fn is_falsy(&self, value: &Value) -> bool {
        (self.falsy)(value)
    }

    pub fn notify_unresolved(&self, unresolved: &UnresolvedPath) {
        (self.on_unresolved)(unresolved);
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn is_strict(&self) -> bool {
        self.policy == ErrorPolicy::Strict
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("formatters", &self.formatters.len())
            .field("resolvers", &self.resolvers.len())
            .field("descriptors", &self.descriptors.keys().collect::<Vec<_>>())
            .field("converters", &self.converters.len())
            .field("policy", &self.policy)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}
