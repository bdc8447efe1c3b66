//! Evaluation contexts.
//!
//! Every step of a path produces a [`ContextObject`] that remembers the
//! value it holds and the context it was reached from. Contexts live in a
//! [`ContextArena`] owned by one evaluation and refer to their parents by
//! [`ContextId`], so `../` and `~` walk indices instead of pointers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::EngineConfig;
use crate::evaluator::EvalError;
use crate::value::Value;

/// Index of a context within its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

#[derive(Debug, Clone)]
pub struct ContextObject {
    pub value: Value,
    /// Member name this context was reached through; empty for the root,
    /// literals and computed values.
    pub key: String,
    pub parent: Option<ContextId>,
    /// False for the synthetic frames created by lambda invocations, which
    /// `../` skips.
    pub is_natural: bool,
}

/// All contexts created during one evaluation.
#[derive(Debug, Default)]
pub struct ContextArena {
    objects: Vec<ContextObject>,
    aborted: bool,
}

impl ContextArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, object: ContextObject) -> ContextId {
        self.objects.push(object);
        ContextId(self.objects.len() - 1)
    }

    pub fn root(&mut self, value: Value) -> ContextId {
        self.insert(ContextObject {
            value,
            key: String::new(),
            parent: None,
            is_natural: true,
        })
    }

    /// A natural context reached from `parent` through `key`.
    pub fn child(&mut self, parent: ContextId, key: impl Into<String>, value: Value) -> ContextId {
        self.insert(ContextObject {
            value,
            key: key.into(),
            parent: Some(parent),
            is_natural: true,
        })
    }

    /// A frame that `../` looks through.
    pub fn synthetic(&mut self, parent: ContextId, value: Value) -> ContextId {
        self.insert(ContextObject {
            value,
            key: String::new(),
            parent: Some(parent),
            is_natural: false,
        })
    }

    pub fn get(&self, id: ContextId) -> &ContextObject {
        &self.objects[id.0]
    }

    pub fn value(&self, id: ContextId) -> &Value {
        &self.objects[id.0].value
    }

    pub fn parent(&self, id: ContextId) -> Option<ContextId> {
        self.objects[id.0].parent
    }

    /// Top of the parent chain.
    pub fn root_of(&self, id: ContextId) -> ContextId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// The nearest natural context at or above `id`.
    fn natural_self(&self, id: ContextId) -> ContextId {
        let mut current = id;
        while !self.get(current).is_natural {
            match self.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Target of `../`: the nearest natural ancestor. A synthetic frame
    /// stands in for the natural context it was created from. The root is
    /// its own parent.
    pub fn natural_parent(&self, id: ContextId) -> ContextId {
        let start = self.natural_self(id);
        let mut current = match self.parent(start) {
            Some(parent) => parent,
            None => return start,
        };
        loop {
            if self.get(current).is_natural {
                return current;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Key path from the root to `id`, e.g. `order.items`.
    pub fn path_of(&self, id: ContextId) -> String {
        let mut keys = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            let object = self.get(c);
            if !object.key.is_empty() {
                keys.push(object.key.as_str());
            }
            current = object.parent;
        }
        keys.reverse();
        keys.join(".")
    }

    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Shared flag an embedding application sets to stop running evaluations.
/// Polled at formatter calls and lambda invocations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-evaluation state: the arena, the alias stack, the recursion depth
/// and the cancellation token, plus the shared engine configuration.
pub struct Scope<'c> {
    pub config: &'c EngineConfig,
    pub arena: ContextArena,
    aliases: Vec<(String, ContextId)>,
    depth: usize,
    cancellation: CancellationToken,
}

impl<'c> Scope<'c> {
    pub fn new(config: &'c EngineConfig) -> Self {
        Scope {
            config,
            arena: ContextArena::new(),
            aliases: Vec::new(),
            depth: 0,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Fail with [`EvalError::Cancelled`] once the token is set.
    pub fn check_cancelled(&mut self) -> Result<(), EvalError> {
        if self.cancellation.is_cancelled() {
            self.arena.abort();
            return Err(EvalError::Cancelled);
        }
        Ok(())
    }

    /// Innermost binding of `name`.
    pub fn alias(&self, name: &str) -> Option<ContextId> {
        self.aliases
            .iter()
            .rev()
            .find(|(alias, _)| alias == name)
            .map(|&(_, id)| id)
    }

    pub fn push_alias(&mut self, name: impl Into<String>, id: ContextId) {
        self.aliases.push((name.into(), id));
    }

    /// Marker for [`Scope::restore_aliases`].
    pub fn alias_mark(&self) -> usize {
        self.aliases.len()
    }

    pub fn restore_aliases(&mut self, mark: usize) {
        self.aliases.truncate(mark);
    }

    pub fn is_falsy(&self, value: &Value) -> bool {
        self.config.is_falsy(value)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn enter(&mut self) -> Result<(), EvalError> {
        if self.depth >= self.config.max_depth() {
            return Err(EvalError::RecursionLimit(self.config.max_depth()));
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_parent_skips_synthetic_frames() {
        let mut arena = ContextArena::new();
        let root = arena.root(Value::Null);
        let order = arena.child(root, "order", Value::Null);
        let items = arena.child(order, "items", Value::Null);
        let frame = arena.synthetic(items, Value::Null);
        assert_eq!(arena.natural_parent(items), order);
        assert_eq!(arena.natural_parent(frame), order);
        assert_eq!(arena.natural_parent(root), root);
        assert_eq!(arena.root_of(frame), root);
        assert_eq!(arena.path_of(items), "order.items");
    }

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let copy = token.clone();
        copy.cancel();
        assert!(token.is_cancelled());
    }
}
