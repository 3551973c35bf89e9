//! Dependency Graph
//!
//! This module implements the computational dependency graph that tracks
//! relationships between reactive values and computations.
//!
//! # Overview
//!
//! - Nodes represent reactive values (signals) or computations (memos, effects)
//! - Edges represent dependencies: if A depends on B, there is an edge from B to A
//!
//! When a signal changes, we traverse the graph to find all affected nodes
//! and mark them dirty. Memos re-evaluate lazily when read; effects are
//! returned to the runtime for scheduling.
//!
//! The graph tolerates cycles: form calculations may legitimately refer to
//! each other, so propagation uses a visited set instead of assuming a DAG.

mod node;
mod scheduler;

pub use node::{DirtyState, GraphNode, NodeKind, ReactiveId};
pub use scheduler::DependencyGraph;
