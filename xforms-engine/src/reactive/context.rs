//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal or memo is read,
//! the current computation is recorded as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing computation.
//! When entering a reactive context (running a memo or effect), we push
//! an entry onto the stack. When the computation completes, we pop it.
//!
//! An entry without a subscriber marks an untracked region: reads inside it
//! register nothing, even when an outer computation is running.

use std::cell::RefCell;

use smallvec::SmallVec;

use crate::graph::ReactiveId;

/// Dependencies read by a single run of a computation.
pub type DependencyList = SmallVec<[ReactiveId; 8]>;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug, Clone)]
struct ContextEntry {
    /// The computation being run, or `None` for an untracked region.
    subscriber_id: Option<ReactiveId>,
    /// Sources read during this computation, deduplicated, in read order.
    dependencies: DependencyList,
}

/// Guard that pops the context when dropped.
///
/// This keeps the stack balanced even if the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<ReactiveId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// The context is exited when the returned guard is dropped.
    pub fn enter(subscriber_id: ReactiveId) -> Self {
        Self::push(Some(subscriber_id))
    }

    /// Enter an untracked region.
    pub fn untracked() -> Self {
        Self::push(None)
    }

    fn push(subscriber_id: Option<ReactiveId>) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                dependencies: DependencyList::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// Get the current subscriber ID, if reads are being tracked.
    pub fn current_subscriber() -> Option<ReactiveId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().and_then(|entry| entry.subscriber_id))
    }

    /// Record a dependency on the given source.
    ///
    /// Called by signals and memos when they are read.
    pub fn track_dependency(source_id: ReactiveId) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if entry.subscriber_id.is_some() && !entry.dependencies.contains(&source_id) {
                    entry.dependencies.push(source_id);
                }
            }
        });
    }

    /// Get the dependencies collected in the current context.
    pub fn get_dependencies() -> DependencyList {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.clone())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        // The stack may already be gone during thread teardown.
        let _ = CONTEXT_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

/// Run `f` without tracking any reads it performs.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_subscriber() {
        let id = ReactiveId::new();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(id);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn context_deduplicates_dependencies() {
        let id = ReactiveId::new();
        let _ctx = ReactiveContext::enter(id);

        let (a, b) = (ReactiveId::new(), ReactiveId::new());
        ReactiveContext::track_dependency(a);
        ReactiveContext::track_dependency(b);
        ReactiveContext::track_dependency(a);

        assert_eq!(ReactiveContext::get_dependencies().as_slice(), &[a, b]);
    }

    #[test]
    fn untracked_region_hides_reads_from_outer_context() {
        let outer = ReactiveId::new();
        let _ctx = ReactiveContext::enter(outer);

        untrack(|| {
            assert!(!ReactiveContext::is_active());
            ReactiveContext::track_dependency(ReactiveId::new());
        });

        assert!(ReactiveContext::get_dependencies().is_empty());
        assert_eq!(ReactiveContext::current_subscriber(), Some(outer));
    }

    #[test]
    fn nested_contexts() {
        let id1 = ReactiveId::new();
        let id2 = ReactiveId::new();

        {
            let _ctx1 = ReactiveContext::enter(id1);
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(id2);
                assert_eq!(ReactiveContext::current_subscriber(), Some(id2));
            }

            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }
}
