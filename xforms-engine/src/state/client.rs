//! Client state: what a host observes of a node.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::{EngineState, PropertyClassification, StateValue};
use crate::reactive::{untrack, Effect, ReactiveScope};

/// A host-owned reactive object receiving state updates.
pub trait HostReactiveObject {
    fn get(&self, key: &str) -> Option<StateValue>;

    fn set(&self, key: &str, value: StateValue);
}

/// Creates host reactive objects.
///
/// A factory that is engine-compatible can observe engine state directly;
/// any other receives a snapshot and is kept current by effects.
pub trait ReactiveObjectFactory {
    fn is_engine_compatible(&self) -> bool {
        false
    }

    fn create(&self, initial: IndexMap<String, StateValue>) -> Rc<dyn HostReactiveObject>;
}

/// Shares engine state with the host as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStateFactory;

impl ReactiveObjectFactory for EngineStateFactory {
    fn is_engine_compatible(&self) -> bool {
        true
    }

    fn create(&self, initial: IndexMap<String, StateValue>) -> Rc<dyn HostReactiveObject> {
        Rc::new(SnapshotObject::new(initial))
    }
}

/// Produces plain [`SnapshotObject`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotFactory;

impl ReactiveObjectFactory for SnapshotFactory {
    fn create(&self, initial: IndexMap<String, StateValue>) -> Rc<dyn HostReactiveObject> {
        Rc::new(SnapshotObject::new(initial))
    }
}

/// A non-reactive property bag that records every write.
#[derive(Debug, Default)]
pub struct SnapshotObject {
    values: RefCell<IndexMap<String, StateValue>>,
    writes: RefCell<usize>,
}

impl SnapshotObject {
    pub fn new(initial: IndexMap<String, StateValue>) -> Self {
        Self {
            values: RefCell::new(initial),
            writes: RefCell::new(0),
        }
    }

    pub fn snapshot(&self) -> IndexMap<String, StateValue> {
        self.values.borrow().clone()
    }

    /// Number of `set` calls received.
    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl HostReactiveObject for SnapshotObject {
    fn get(&self, key: &str) -> Option<StateValue> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: StateValue) {
        *self.writes.borrow_mut() += 1;
        self.values.borrow_mut().insert(key.to_string(), value);
    }
}

/// A node's state as seen by the host.
#[derive(Clone)]
pub enum ClientState {
    /// The engine state itself.
    Engine(EngineState),

    /// A host object kept in sync with engine state.
    Host {
        object: Rc<dyn HostReactiveObject>,
        effects: Vec<Effect>,
    },
}

impl ClientState {
    /// Build client state for `engine` within `scope`.
    pub fn new(
        engine: &EngineState,
        factory: &dyn ReactiveObjectFactory,
        scope: &ReactiveScope,
    ) -> Self {
        if factory.is_engine_compatible() {
            return Self::Engine(engine.clone());
        }

        let object = factory.create(untrack(|| engine.snapshot()));
        let effects = engine
            .keys()
            .filter(|key| engine.classification(key) != Some(PropertyClassification::Static))
            .map(|key| {
                let engine = engine.clone();
                let object = Rc::clone(&object);
                scope.run_task(|| {
                    Effect::new(move || {
                        if let Some(value) = engine.get(key) {
                            object.set(key, value);
                        }
                    })
                })
            })
            .collect();

        Self::Host { object, effects }
    }

    pub fn get(&self, key: &str) -> Option<StateValue> {
        match self {
            Self::Engine(state) => state.get(key),
            Self::Host { object, .. } => object.get(key),
        }
    }

    pub fn is_engine_state(&self) -> bool {
        matches!(self, Self::Engine(_))
    }
}

impl fmt::Debug for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engine(state) => f.debug_tuple("Engine").field(state).finish(),
            Self::Host { effects, .. } => f
                .debug_struct("Host")
                .field("effects", &effects.len())
                .finish_non_exhaustive(),
        }
    }
}
