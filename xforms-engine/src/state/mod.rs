//! Node state
//!
//! Every node keeps its observable properties in a [`SpecifiedState`]
//! record. Properties are mutable (the engine writes them through
//! node methods), computed (derived reactively) or static (fixed at
//! construction).
//!
//! The host sees a node's state through [`ClientState`], built by the
//! host's [`ReactiveObjectFactory`], and reads it through the
//! [`CurrentState`] facade.

mod client;
mod current;
mod engine;
mod specified;
mod value;

pub use client::{
    ClientState, EngineStateFactory, HostReactiveObject, ReactiveObjectFactory, SnapshotFactory,
    SnapshotObject,
};
pub use current::CurrentState;
pub use engine::EngineState;
pub use specified::{PropertyClassification, PropertySpec, SpecifiedState};
pub use value::StateValue;
