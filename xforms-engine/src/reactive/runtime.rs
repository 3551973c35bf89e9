//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the dependency graph, the registry of live computations,
//! the pending effect queue and the scope arena.
//!
//! # How It Works
//!
//! 1. When a signal is created, it registers a source node with the runtime.
//!
//! 2. When a memo or effect runs, the sources it read become its
//!    dependencies in the graph.
//!
//! 3. When a signal's value changes, the runtime:
//!    a. Marks direct dependents dirty and everything downstream maybe-dirty
//!    b. Queues the reached effects
//!    c. Flushes the queue synchronously unless a batch is open
//!    d. Memos are lazy - they recompute on next access
//!
//! # Threading
//!
//! The runtime is thread-local. Every form instance lives on one thread, and
//! all propagation runs synchronously on the call stack that caused it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use tracing::{trace, warn};

use super::context::ReactiveContext;
use super::scope::{ScopeArena, ScopeId};
use crate::graph::{DependencyGraph, DirtyState, GraphNode, NodeKind, ReactiveId};

/// Default cap on effect runs within one flush.
pub const DEFAULT_MAX_EFFECT_RUNS: usize = 10_000;

/// A computation the runtime can re-run: memos and effects.
pub trait Reactive {
    /// The graph identity of this computation.
    fn reactive_id(&self) -> ReactiveId;

    /// Re-run the computation, returning whether its observable value changed.
    fn run(&self) -> bool;

    /// Permanently stop the computation and drop it from the graph.
    fn dispose(&self);

    /// Check if this reactive value is an effect (eager) or memo (lazy).
    fn is_eager(&self) -> bool;
}

/// Thread-local reactive runtime state.
pub struct Runtime {
    graph: RefCell<DependencyGraph>,

    // Weak so that dropping the last handle of an unowned memo frees it.
    registry: RefCell<HashMap<ReactiveId, Weak<dyn Reactive>>>,

    pending: RefCell<IndexSet<ReactiveId>>,
    batch_depth: Cell<usize>,
    flushing: Cell<bool>,
    max_effect_runs: Cell<usize>,

    pub(crate) scopes: RefCell<ScopeArena>,
    owners: RefCell<Vec<ScopeId>>,
}

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let _ = RUNTIME.try_with(|rt| rt.batch_depth.set(rt.batch_depth.get().saturating_sub(1)));
    }
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let _ = RUNTIME.try_with(|rt| rt.flushing.set(false));
    }
}

pub(crate) struct OwnerGuard;

impl Drop for OwnerGuard {
    fn drop(&mut self) {
        let _ = RUNTIME.try_with(|rt| rt.owners.borrow_mut().pop());
    }
}

impl Runtime {
    fn new() -> Self {
        Self {
            graph: RefCell::new(DependencyGraph::new()),
            registry: RefCell::new(HashMap::new()),
            pending: RefCell::new(IndexSet::new()),
            batch_depth: Cell::new(0),
            flushing: Cell::new(false),
            max_effect_runs: Cell::new(DEFAULT_MAX_EFFECT_RUNS),
            scopes: RefCell::new(ScopeArena::default()),
            owners: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn with<R>(f: impl FnOnce(&Runtime) -> R) -> R {
        RUNTIME.with(f)
    }

    /// Register a signal's source node.
    pub(crate) fn register_source(id: ReactiveId) {
        Self::with(|rt| {
            rt.graph.borrow_mut().add_node(GraphNode::source(id));
        });
    }

    /// Register a memo or effect, adopting it into the ambient scope.
    pub(crate) fn register(reactive: Rc<dyn Reactive>) {
        let id = reactive.reactive_id();
        let node = if reactive.is_eager() {
            GraphNode::effect(id)
        } else {
            GraphNode::derived(id)
        };

        let adopted = Self::with(|rt| {
            rt.graph.borrow_mut().add_node(node);
            rt.registry
                .borrow_mut()
                .insert(id, Rc::downgrade(&reactive));

            match rt.owners.borrow().last() {
                Some(owner) => rt.scopes.borrow_mut().adopt(*owner, Rc::clone(&reactive)),
                None => true,
            }
        });

        if !adopted {
            warn!(?id, "computation created in a disposed scope; disposing it");
            reactive.dispose();
        }
    }

    /// Remove a reactive value from the graph and registry.
    pub(crate) fn unregister(id: ReactiveId) {
        let _ = RUNTIME.try_with(|rt| {
            if let Ok(mut graph) = rt.graph.try_borrow_mut() {
                graph.remove_node(id);
            }
            if let Ok(mut registry) = rt.registry.try_borrow_mut() {
                registry.remove(&id);
            }
            if let Ok(mut pending) = rt.pending.try_borrow_mut() {
                pending.shift_remove(&id);
            }
        });
    }

    /// Record that the running computation read `source`.
    pub(crate) fn track_read(source: ReactiveId) {
        ReactiveContext::track_dependency(source);
    }

    /// Replace the recorded dependencies of a computation after it ran.
    pub(crate) fn set_dependencies(id: ReactiveId, dependencies: &[ReactiveId]) {
        Self::with(|rt| {
            rt.graph
                .borrow_mut()
                .replace_dependencies(id, dependencies.iter().copied());
        });
    }

    pub(crate) fn dirty_state(id: ReactiveId) -> Option<DirtyState> {
        Self::with(|rt| rt.graph.borrow().dirty_state(id))
    }

    /// Mark a computation dirty without touching its dependents.
    pub(crate) fn invalidate(id: ReactiveId) {
        Self::with(|rt| rt.graph.borrow_mut().mark_dirty(id));
    }

    /// Number of graph edges pointing out of `id`.
    pub(crate) fn dependent_count(id: ReactiveId) -> usize {
        Self::with(|rt| {
            rt.graph
                .borrow()
                .get_node(id)
                .map(|node| node.dependents().len())
                .unwrap_or(0)
        })
    }

    /// Number of graph edges pointing into `id`.
    pub(crate) fn dependency_count(id: ReactiveId) -> usize {
        Self::with(|rt| rt.graph.borrow().dependencies_of(id).len())
    }

    /// Notify all dependents that a signal changed.
    ///
    /// This is the core update propagation mechanism.
    pub(crate) fn notify_signal_change(signal_id: ReactiveId) {
        let idle = Self::with(|rt| {
            let effects = rt.graph.borrow_mut().mark_changed(signal_id);
            rt.pending.borrow_mut().extend(effects);
            rt.batch_depth.get() == 0
        });

        if idle {
            Self::flush_effects();
        }
    }

    /// Queue an effect; runs it right away unless a batch or flush is open.
    pub(crate) fn schedule(id: ReactiveId) {
        let idle = Self::with(|rt| {
            rt.graph.borrow_mut().mark_dirty(id);
            rt.pending.borrow_mut().insert(id);
            rt.batch_depth.get() == 0
        });

        if idle {
            Self::flush_effects();
        }
    }

    /// Bring a memo or effect up to date, re-running it only if an input
    /// actually changed.
    pub(crate) fn update_if_necessary(id: ReactiveId) {
        let state = Self::with(|rt| rt.graph.borrow().dirty_state(id));

        match state {
            None | Some(DirtyState::Clean) => return,
            Some(DirtyState::MaybeDirty) => {
                let dependencies = Self::with(|rt| rt.graph.borrow().dependencies_of(id));
                for dependency in dependencies {
                    let kind = Self::with(|rt| rt.graph.borrow().kind(dependency));
                    if kind == Some(NodeKind::Derived) {
                        Self::update_if_necessary(dependency);
                    }
                    if Self::with(|rt| rt.graph.borrow().dirty_state(id)) == Some(DirtyState::Dirty) {
                        break;
                    }
                }
            }
            Some(DirtyState::Dirty) => {}
        }

        let (still_dirty, reactive) = Self::with(|rt| {
            let mut graph = rt.graph.borrow_mut();
            let dirty = graph.dirty_state(id) == Some(DirtyState::Dirty);
            // Clean before running so writes during the run can dirty it again.
            graph.mark_clean(id);
            let reactive = rt.registry.borrow().get(&id).and_then(Weak::upgrade);
            (dirty, reactive)
        });

        if !still_dirty {
            return;
        }

        match reactive {
            Some(reactive) => {
                if reactive.run() {
                    Self::with(|rt| rt.graph.borrow_mut().mark_dependents_dirty(id));
                }
            }
            None => Self::unregister(id),
        }
    }

    /// Run every queued effect.
    ///
    /// Re-entrant calls return immediately; the outer flush picks up effects
    /// queued while it runs.
    pub(crate) fn flush_effects() {
        let already_flushing = Self::with(|rt| rt.flushing.replace(true));
        if already_flushing {
            return;
        }
        let _guard = FlushGuard;

        let limit = Self::with(|rt| rt.max_effect_runs.get());
        let mut runs = 0usize;

        loop {
            let next = Self::with(|rt| rt.pending.borrow_mut().shift_remove_index(0));
            let Some(id) = next else { break };

            runs += 1;
            if runs > limit {
                let dropped = Self::with(|rt| {
                    let mut pending = rt.pending.borrow_mut();
                    let dropped = pending.len() + 1;
                    pending.clear();
                    dropped
                });
                warn!(limit, dropped, "effect flush exceeded its run limit; dropping queued effects");
                break;
            }

            Self::update_if_necessary(id);
        }

        if runs > 0 {
            trace!(runs, "flushed effects");
        }
    }

    /// Run `f` with effect flushing deferred until the outermost batch ends.
    pub fn batch<R>(f: impl FnOnce() -> R) -> R {
        Self::with(|rt| rt.batch_depth.set(rt.batch_depth.get() + 1));
        let result = {
            let _guard = BatchGuard;
            f()
        };

        if Self::with(|rt| rt.batch_depth.get()) == 0 {
            Self::flush_effects();
        }
        result
    }

    /// Check if a batch is currently open.
    pub fn is_batching() -> bool {
        Self::with(|rt| rt.batch_depth.get() > 0)
    }

    /// Set the cap on effect runs per flush for this thread.
    pub fn set_max_effect_runs(limit: usize) {
        Self::with(|rt| rt.max_effect_runs.set(limit.max(1)));
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<ReactiveId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a tracking context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }

    /// Number of live graph nodes on this thread.
    pub fn node_count() -> usize {
        Self::with(|rt| rt.graph.borrow().node_count())
    }

    pub(crate) fn current_owner() -> Option<ScopeId> {
        Self::with(|rt| rt.owners.borrow().last().copied())
    }

    pub(crate) fn push_owner(owner: ScopeId) -> OwnerGuard {
        Self::with(|rt| rt.owners.borrow_mut().push(owner));
        OwnerGuard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct MockReactive {
        id: ReactiveId,
        runs: Cell<usize>,
        eager: bool,
    }

    impl MockReactive {
        fn new(eager: bool) -> Rc<Self> {
            Rc::new(Self {
                id: ReactiveId::new(),
                runs: Cell::new(0),
                eager,
            })
        }
    }

    impl Reactive for MockReactive {
        fn reactive_id(&self) -> ReactiveId {
            self.id
        }

        fn run(&self) -> bool {
            self.runs.set(self.runs.get() + 1);
            true
        }

        fn dispose(&self) {
            Runtime::unregister(self.id);
        }

        fn is_eager(&self) -> bool {
            self.eager
        }
    }

    #[test]
    fn runtime_registers_and_unregisters() {
        let reactive = MockReactive::new(false);
        let before = Runtime::node_count();

        Runtime::register(reactive.clone());
        assert_eq!(Runtime::node_count(), before + 1);

        Runtime::unregister(reactive.id);
        assert_eq!(Runtime::node_count(), before);
    }

    #[test]
    fn runtime_runs_only_eager_dependents() {
        let memo = MockReactive::new(false);
        let effect = MockReactive::new(true);
        let source = ReactiveId::new();

        Runtime::register_source(source);
        Runtime::register(memo.clone());
        Runtime::register(effect.clone());
        Runtime::set_dependencies(memo.id, &[source]);
        Runtime::set_dependencies(effect.id, &[source]);

        Runtime::notify_signal_change(source);

        assert_eq!(memo.runs.get(), 0);
        assert_eq!(effect.runs.get(), 1);
    }

    #[test]
    fn batch_defers_effects_until_the_outermost_batch_ends() {
        let effect = MockReactive::new(true);
        let source = ReactiveId::new();

        Runtime::register_source(source);
        Runtime::register(effect.clone());
        Runtime::set_dependencies(effect.id, &[source]);

        Runtime::batch(|| {
            Runtime::notify_signal_change(source);
            Runtime::batch(|| Runtime::notify_signal_change(source));
            assert_eq!(effect.runs.get(), 0);
        });

        assert_eq!(effect.runs.get(), 1);
    }
}
