//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect is scheduled. Outside a batch it runs
//!    immediately to establish initial dependencies; inside a batch it runs
//!    when the outermost batch ends.
//!
//! 2. When any dependency changes, the effect is queued and re-run in
//!    topological order with the other reached effects.
//!
//! 3. Each run replaces the effect's dependencies with the ones it read.
//!
//! # Use Cases
//!
//! Effects synchronize reactive state with the outside world:
//!
//! - Pushing engine state into host-provided reactive objects
//! - Renumbering repeat instances after structural changes
//!
//! # Differences from Memo
//!
//! - Memos return a value; effects do not.
//! - Memos are lazy (compute on access); effects are eager (run when deps change).
//!
//! # Lifetime
//!
//! An effect created inside [`ReactiveScope::run_task`](super::ReactiveScope::run_task)
//! is owned by that scope and lives until the scope is disposed. An unowned
//! effect lives as long as one of its handles.

use std::cell::Cell;
use std::rc::Rc;

use super::context::ReactiveContext;
use super::runtime::{Reactive, Runtime};
use crate::graph::ReactiveId;

struct EffectInner {
    id: ReactiveId,
    run: Box<dyn Fn()>,
    disposed: Cell<bool>,
    run_count: Cell<usize>,
}

impl Reactive for EffectInner {
    fn reactive_id(&self) -> ReactiveId {
        self.id
    }

    fn run(&self) -> bool {
        if self.disposed.get() {
            return false;
        }

        let dependencies = {
            let _ctx = ReactiveContext::enter(self.id);
            (self.run)();
            ReactiveContext::get_dependencies()
        };

        Runtime::set_dependencies(self.id, &dependencies);
        self.run_count.set(self.run_count.get() + 1);
        false
    }

    fn dispose(&self) {
        if !self.disposed.replace(true) {
            Runtime::unregister(self.id);
        }
    }

    fn is_eager(&self) -> bool {
        true
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use xforms_engine::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let seen = Rc::new(Cell::new(0));
///
/// let _effect = {
///     let (count, seen) = (count.clone(), seen.clone());
///     Effect::new(move || seen.set(count.get()))
/// };
///
/// count.set(5);
/// assert_eq!(seen.get(), 5);
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create a new effect and schedule its first run.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        let inner = Rc::new(EffectInner {
            id: ReactiveId::new(),
            run: Box::new(run),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
        });
        Runtime::register(inner.clone());

        if !inner.disposed.get() {
            Runtime::schedule(inner.id);
        }
        Self { inner }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> ReactiveId {
        self.inner.id
    }

    /// Run the effect function now, regardless of its dirty state.
    pub fn execute(&self) {
        self.inner.run();
    }

    /// Queue the effect to re-run.
    pub fn schedule(&self) {
        if !self.inner.disposed.get() {
            Runtime::schedule(self.inner.id);
        }
    }

    /// Dispose the effect, preventing future runs.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Number of sources read by the last run.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.id)
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("disposed", &self.inner.disposed.get())
            .field("run_count", &self.inner.run_count.get())
            .finish()
    }
}
