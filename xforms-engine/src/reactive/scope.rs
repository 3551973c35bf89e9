//! Reactive Scopes
//!
//! A scope is a disposable owner for memos and effects. Computations created
//! while a scope's task runs are adopted by it; disposing the scope tears all
//! of them down, including those owned by nested scopes.
//!
//! Scopes live in an arena inside the runtime, keyed by [`ScopeId`]. A
//! [`ReactiveScope`] is only a handle: disposal removes the arena entries of
//! the whole subtree, so a missing entry means "disposed".

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::runtime::{Reactive, Runtime};

/// Unique identifier for a scope in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Returned when a scope is disposed twice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("reactive scope {0:?} has already been disposed")]
pub struct DisposedScopeError(pub ScopeId);

struct ScopeEntry {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    owned: Vec<Rc<dyn Reactive>>,
}

/// Arena of live scopes.
#[derive(Default)]
pub(crate) struct ScopeArena {
    entries: HashMap<ScopeId, ScopeEntry>,
}

impl ScopeArena {
    fn insert(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::new();
        // A disposed parent cannot adopt; the new scope becomes a root.
        let parent = parent.filter(|parent| self.entries.contains_key(parent));
        if let Some(parent) = parent {
            if let Some(entry) = self.entries.get_mut(&parent) {
                entry.children.push(id);
            }
        }
        self.entries.insert(
            id,
            ScopeEntry {
                parent,
                children: Vec::new(),
                owned: Vec::new(),
            },
        );
        id
    }

    /// Give ownership of `reactive` to `owner`. Fails if `owner` is disposed.
    pub(crate) fn adopt(&mut self, owner: ScopeId, reactive: Rc<dyn Reactive>) -> bool {
        match self.entries.get_mut(&owner) {
            Some(entry) => {
                entry.owned.push(reactive);
                true
            }
            None => false,
        }
    }

    fn contains(&self, id: ScopeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Remove the subtree rooted at `id`, returning its computations with
    /// the deepest scopes first.
    fn take_subtree(&mut self, id: ScopeId) -> Result<Vec<Rc<dyn Reactive>>, DisposedScopeError> {
        let entry = self.entries.remove(&id).ok_or(DisposedScopeError(id))?;

        if let Some(parent) = entry.parent.and_then(|parent| self.entries.get_mut(&parent)) {
            parent.children.retain(|child| *child != id);
        }

        let mut owned = Vec::new();
        self.drain(entry, &mut owned);
        Ok(owned)
    }

    fn drain(&mut self, entry: ScopeEntry, owned: &mut Vec<Rc<dyn Reactive>>) {
        for child in entry.children {
            if let Some(child_entry) = self.entries.remove(&child) {
                self.drain(child_entry, owned);
            }
        }
        owned.extend(entry.owned);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Handle to a disposable ownership context for reactive computations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactiveScope {
    id: ScopeId,
}

impl ReactiveScope {
    /// Create a scope nested under `parent`.
    ///
    /// Without an explicit parent the scope nests under the ambient owner
    /// (the scope whose task is running), or becomes a root.
    pub fn new(parent: Option<&ReactiveScope>) -> Self {
        let parent = parent.map(|scope| scope.id).or_else(Runtime::current_owner);
        let id = Runtime::with(|rt| rt.scopes.borrow_mut().insert(parent));
        Self { id }
    }

    /// Create a root scope, ignoring any ambient owner.
    pub fn root() -> Self {
        let id = Runtime::with(|rt| rt.scopes.borrow_mut().insert(None));
        Self { id }
    }

    /// Create a scope nested under this one.
    pub fn child(&self) -> Self {
        Self::new(Some(self))
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Run `f` with this scope as the owner of every computation it creates.
    pub fn run_task<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = Runtime::push_owner(self.id);
        f()
    }

    /// Dispose this scope and everything nested under it.
    ///
    /// Fails with [`DisposedScopeError`] if the scope was already disposed,
    /// directly or through an ancestor.
    pub fn dispose(&self) -> Result<(), DisposedScopeError> {
        let owned = Runtime::with(|rt| rt.scopes.borrow_mut().take_subtree(self.id))?;
        trace!(scope = ?self.id, computations = owned.len(), "disposing scope");

        for reactive in &owned {
            reactive.dispose();
        }
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        !Runtime::with(|rt| rt.scopes.borrow().contains(self.id))
    }

    /// Number of live scopes on this thread.
    pub fn live_count() -> usize {
        Runtime::with(|rt| rt.scopes.borrow().len())
    }
}
