use std::ops::Deref;
use std::rc::Rc;

use super::SpecifiedState;

/// The engine's privileged view of a node's state.
///
/// Cloning shares the same record.
#[derive(Debug, Clone)]
pub struct EngineState(Rc<SpecifiedState>);

impl EngineState {
    pub fn new(state: SpecifiedState) -> Self {
        Self(Rc::new(state))
    }

    pub fn ptr_eq(&self, other: &EngineState) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for EngineState {
    type Target = SpecifiedState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
