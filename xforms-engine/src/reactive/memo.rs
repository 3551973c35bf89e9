//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation and caches the result.
//!
//! 2. When accessed again, if no dependencies have changed, returns cached value.
//!
//! 3. When a dependency changes, the memo is marked dirty (direct input) or
//!    maybe-dirty (transitive input).
//!
//! 4. On next access, a maybe-dirty memo first brings its memo inputs up to
//!    date; it recomputes only if one of them actually changed.
//!
//! 5. A recomputation that yields an equal value does not dirty dependents.
//!
//! # Cycles
//!
//! A memo read while it is computing (directly or through other memos) is a
//! cycle. The inner read returns the last cached value, or the memo's
//! fallback, and a warning is logged.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::Rc;

use tracing::warn;

use super::context::{untrack, ReactiveContext};
use super::runtime::{Reactive, Runtime};
use crate::graph::{DirtyState, ReactiveId};

/// Dirty state for a memo, as observed from its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency might have changed. Need to check.
    MaybeDirty,

    /// The memo definitely needs to recompute.
    Dirty,

    /// The memo was disposed; its last value is frozen.
    Disposed,
}

struct MemoInner<T> {
    id: ReactiveId,
    compute: Box<dyn Fn() -> T>,
    value: RefCell<Option<T>>,
    fallback: Option<T>,
    computing: Cell<bool>,
    disposed: Cell<bool>,
}

impl<T: Clone + PartialEq + 'static> Reactive for MemoInner<T> {
    fn reactive_id(&self) -> ReactiveId {
        self.id
    }

    fn run(&self) -> bool {
        if self.disposed.get() {
            return false;
        }

        self.computing.set(true);
        let (new_value, dependencies) = {
            let _ctx = ReactiveContext::enter(self.id);
            let value = (self.compute)();
            (value, ReactiveContext::get_dependencies())
        };
        self.computing.set(false);

        Runtime::set_dependencies(self.id, &dependencies);

        let changed = self.value.borrow().as_ref() != Some(&new_value);
        if changed {
            *self.value.borrow_mut() = Some(new_value);
        }
        changed
    }

    fn dispose(&self) {
        if !self.disposed.replace(true) {
            Runtime::unregister(self.id);
        }
    }

    fn is_eager(&self) -> bool {
        false
    }
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// The PartialEq bound is needed to detect when the computed value actually
/// changed (some memos return the same value even if inputs changed).
pub struct Memo<T>
where
    T: Clone + PartialEq + 'static,
{
    inner: Rc<MemoInner<T>>,
}

impl<T> Memo<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(None, compute)
    }

    /// Create a memo that yields `fallback` when read inside its own cycle
    /// before it has ever produced a value.
    pub fn with_fallback<F>(fallback: T, compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self::build(Some(fallback), compute)
    }

    fn build<F>(fallback: Option<T>, compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let inner = Rc::new(MemoInner {
            id: ReactiveId::new(),
            compute: Box::new(compute),
            value: RefCell::new(None),
            fallback,
            computing: Cell::new(false),
            disposed: Cell::new(false),
        });
        Runtime::register(inner.clone());
        Self { inner }
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> ReactiveId {
        self.inner.id
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        let inner = &self.inner;

        if inner.disposed.get() {
            return self.frozen_value();
        }

        Runtime::track_read(inner.id);

        if inner.computing.get() {
            warn!(memo = ?inner.id, "cycle detected while computing memo");
            return self.frozen_value();
        }

        Runtime::update_if_necessary(inner.id);

        let cached = inner.value.borrow().clone();
        match cached {
            Some(value) => value,
            // Unregistered memos (runtime teardown) still answer reads.
            None => untrack(|| (inner.compute)()),
        }
    }

    /// Get the current value without tracking the read.
    pub fn get_untracked(&self) -> T {
        untrack(|| self.get())
    }

    fn frozen_value(&self) -> T {
        let inner = &self.inner;
        if let Some(value) = inner.value.borrow().clone() {
            return value;
        }
        match &inner.fallback {
            Some(fallback) => fallback.clone(),
            None if inner.computing.get() => {
                panic!("memo {:?} read itself before producing a value", inner.id)
            }
            None => untrack(|| (inner.compute)()),
        }
    }

    /// Force the memo to recompute on its next read.
    pub fn invalidate(&self) {
        Runtime::invalidate(self.inner.id);
    }

    /// Permanently freeze the memo at its last value.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        if self.inner.disposed.get() {
            return MemoState::Disposed;
        }
        match Runtime::dirty_state(self.inner.id) {
            Some(DirtyState::Clean) => MemoState::Clean,
            Some(DirtyState::MaybeDirty) => MemoState::MaybeDirty,
            _ => MemoState::Dirty,
        }
    }

    /// Get the number of computations depending on this memo.
    pub fn dependent_count(&self) -> usize {
        Runtime::dependent_count(self.inner.id)
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .finish()
    }
}
