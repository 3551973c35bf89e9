//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    read is recorded as a dependency of that context.
//!
//! 2. When a signal's value changes, the runtime marks dependents dirty and
//!    runs reached effects.
//!
//! 3. Writing an equal value is a no-op, which is what keeps mutually
//!    dependent calculations from ping-ponging forever.
//!
//! # Memory Layout
//!
//! Each signal consists of:
//! - A unique ID (8 bytes)
//! - The value, behind a shared `RefCell`
//!
//! The graph node is removed when the last clone of the signal is dropped.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::runtime::Runtime;
use crate::graph::ReactiveId;

struct SignalInner<T> {
    id: ReactiveId,
    value: RefCell<T>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
    }
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use xforms_engine::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T: 'static> {
    inner: Rc<SignalInner<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        let id = ReactiveId::new();
        Runtime::register_source(id);
        Self {
            inner: Rc::new(SignalInner {
                id,
                value: RefCell::new(value),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> ReactiveId {
        self.inner.id
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        Runtime::track_read(self.inner.id);
        f(&self.inner.value.borrow())
    }

    /// Borrow the current value without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value and notify dependents, even if it is unchanged.
    pub fn set_unchecked(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        Runtime::notify_signal_change(self.inner.id);
    }

    /// Get the number of computations currently depending on this signal.
    pub fn subscriber_count(&self) -> usize {
        Runtime::dependent_count(self.inner.id)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a dependent.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Set a new value and notify dependents if it differs from the old one.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        if *self.inner.value.borrow() == value {
            return false;
        }
        self.set_unchecked(value);
        true
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = {
            let guard = self.inner.value.borrow();
            f(&guard)
        };
        self.set(new_value)
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}
