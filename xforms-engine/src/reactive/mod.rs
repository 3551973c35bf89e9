//! Reactive Primitives
//!
//! This module implements the reactive system underneath the instance tree:
//! signals, memos, effects and the scopes that own them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal automatically
//! registers that context as a dependent. When the signal's value changes, all
//! dependents are notified.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only when
//! one of its dependencies changes. Every computed form property (relevance,
//! calculated values, labels) is a memo.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its dependencies
//! change. Effects push engine state into client state and renumber repeat
//! instances.
//!
//! ## Scopes
//!
//! A [`ReactiveScope`] owns the memos and effects created while its task runs.
//! Each form node has one, nested under its parent's, so removing a subtree
//! disposes exactly the computations belonging to it.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking context and, if so, register the dependency.

mod context;
mod effect;
mod memo;
mod runtime;
mod scope;
mod signal;

pub use context::{untrack, DependencyList, ReactiveContext};
pub use effect::Effect;
pub use memo::{Memo, MemoState};
pub use runtime::{Reactive, Runtime, DEFAULT_MAX_EFFECT_RUNS};
pub use scope::{DisposedScopeError, ReactiveScope, ScopeId};
pub use signal::Signal;
