//! Repeat ranges and their instances.
//!
//! A range is a runtime-only node grouping the instances of one repeat. It
//! has no element of its own in the instance document; its instances are
//! elements of the range's parent, addressed by position (`rep[2]`).
//!
//! Uncontrolled ranges are edited through [`InstanceNode::add_instances`]
//! and [`InstanceNode::remove_instances`]. Controlled ranges follow a count
//! expression (or are fixed) and reject both.

use std::rc::{Rc, Weak};

use tracing::{debug, error, warn};

use super::children::build_repeat_instance;
use super::container::ChildrenStore;
use super::{InstanceNode, Node, NodePayload, NodeType, Root};
use crate::definition::{BodyElement, NodeDefinition, NodeDefinitionKind, NodeDefinitionRef};
use crate::error::{EngineError, Result};
use crate::reactive::{untrack, Effect, Memo, Runtime, Signal};
use crate::xpath::{
    create_computed_expression, evaluate_in_context, ComputedExpressionOptions, EvaluationContext,
};

pub(crate) struct RepeatRangeState {
    pub(crate) children: ChildrenStore,
    count: Option<Memo<Option<usize>>>,
}

impl RepeatRangeState {
    pub(super) fn new(
        this: &Weak<InstanceNode>,
        definition: &NodeDefinitionRef,
        controlled: bool,
    ) -> Self {
        let count = match definition.body() {
            Some(BodyElement::Repeat {
                count: Some(expression),
                ..
            }) if controlled => Some(count_memo(this, expression.clone())),
            _ => None,
        };

        Self {
            children: ChildrenStore::new(),
            count,
        }
    }
}

pub(crate) struct RepeatInstanceState {
    pub(crate) children: ChildrenStore,
    index: Signal<usize>,
}

impl RepeatInstanceState {
    pub(super) fn new(index: usize) -> Self {
        Self {
            children: ChildrenStore::new(),
            index: Signal::new(index),
        }
    }
}

/// The count expression as a non-negative integer. `None` for values that
/// cannot be a count (blank, NaN, negative).
fn count_memo(this: &Weak<InstanceNode>, expression: String) -> Memo<Option<usize>> {
    let raw = create_computed_expression(
        this.clone(),
        expression,
        ComputedExpressionOptions::new(String::new()),
    );

    Memo::with_fallback(None, move || parse_count(&raw.get()))
}

fn parse_count(value: &str) -> Option<usize> {
    let count = value.trim().parse::<f64>().ok()?;
    // usize::MAX rounds up to 2^64 as f64; the bound below is exclusive.
    (count >= 0.0 && count < usize::MAX as f64).then(|| count.trunc() as usize)
}

/// Self-relevance of a range: any instance is self-relevant, or with no
/// instances the range's `relevant` evaluated at its anchor.
pub(super) fn range_self_relevance(
    this: &Weak<InstanceNode>,
    expression: Option<String>,
) -> Memo<bool> {
    let this = this.clone();
    Memo::with_fallback(true, move || {
        let Some(range) = this.upgrade() else {
            return false;
        };

        let instances = range.child_nodes();
        if !instances.is_empty() {
            return instances.iter().any(|instance| instance.is_self_relevant());
        }

        let Some(expression) = &expression else {
            return true;
        };
        if !range.is_attached() {
            return true;
        }

        let anchor = range.context_node();
        evaluate_in_context::<bool, InstanceNode>(&range, &anchor, expression).unwrap_or_else(
            |err| {
                error!(reference = %range.reference(), expression = %expression, error = %err, "expression evaluation failed");
                true
            },
        )
    })
}

/// Keep instance indexes equal to their positions.
pub(super) fn install_renumbering(range: &Node) {
    let this = Rc::downgrade(&range.0);
    range.scope.run_task(|| {
        Effect::new(move || {
            let Some(range) = this.upgrade() else {
                return;
            };
            let instances = range.child_nodes();
            untrack(|| {
                for (index, instance) in instances.iter().enumerate() {
                    if let NodePayload::RepeatInstance(state) = &instance.payload {
                        state.index.set(index);
                    }
                }
            });
        });
    });
}

/// Grow or shrink a controlled range to its count.
pub(super) fn install_count(range: &Node) {
    let this = Rc::downgrade(&range.0);
    range.scope.run_task(|| {
        Effect::new(move || {
            let Some(range) = this.upgrade() else {
                return;
            };
            let NodePayload::RepeatRange(RepeatRangeState {
                count: Some(count),
                children,
            }) = &range.payload
            else {
                return;
            };
            let Some(target) = count.get() else {
                return;
            };
            let max = range.document().config.max_repeat_count;
            if target > max {
                let reference = untrack(|| range.reference());
                warn!(%reference, count = target, max, "repeat count exceeds the limit; keeping the current count");
                return;
            }

            untrack(|| {
                let current = children.len_untracked();
                let result = if target > current {
                    range.insert_instances(current, target - current)
                } else if target < current {
                    range.detach_instances(target, current - target)
                } else {
                    Ok(())
                };

                match result {
                    Ok(()) if target != current => {
                        debug!(reference = %range.reference(), from = current, to = target, "resized controlled repeat");
                    }
                    Ok(()) => {}
                    Err(err) => error!(reference = %range.reference(), error = %err, "cannot resize controlled repeat"),
                }
            });
        });
    });
}

impl InstanceNode {
    fn range_state(&self, operation: &'static str) -> Result<&RepeatRangeState> {
        match &self.payload {
            NodePayload::RepeatRange(state) => Ok(state),
            _ => Err(EngineError::UnsupportedOperation {
                operation,
                node_type: self.node_type,
            }),
        }
    }

    fn uncontrolled_range(&self, operation: &'static str) -> Result<&RepeatRangeState> {
        match self.node_type {
            NodeType::RepeatRangeUncontrolled => self.range_state(operation),
            node_type => Err(EngineError::UnsupportedOperation {
                operation,
                node_type,
            }),
        }
    }

    pub(crate) fn range_definition(&self) -> Result<Rc<NodeDefinition>> {
        match &self.definition {
            NodeDefinitionRef::Node(definition)
                if matches!(definition.kind, NodeDefinitionKind::Repeat { .. }) =>
            {
                Ok(Rc::clone(definition))
            }
            _ => Err(EngineError::UnsupportedOperation {
                operation: "range_definition",
                node_type: self.node_type,
            }),
        }
    }

    /// Zero-based position of a repeat instance. Reactive.
    pub(crate) fn repeat_index(&self) -> Option<usize> {
        match &self.payload {
            NodePayload::RepeatInstance(state) => Some(state.index.get()),
            _ => None,
        }
    }

    /// The instances of a repeat range, in order. Empty for other nodes.
    pub fn instances(&self) -> Vec<Node> {
        match &self.payload {
            NodePayload::RepeatRange(state) => state.children.nodes(),
            _ => Vec::new(),
        }
    }

    /// The instance at zero-based `index`.
    pub fn instance(&self, index: usize) -> Result<Node> {
        let state = self.range_state("instance")?;
        let instances = state.children.nodes();
        let len = instances.len();
        instances
            .into_iter()
            .nth(index)
            .ok_or(EngineError::RepeatIndexOutOfBounds { index, len })
    }

    /// Number of instances.
    pub fn count(&self) -> usize {
        self.children_store()
            .filter(|_| self.node_type.is_repeat_range())
            .map_or(0, |children| children.ids().len())
    }

    /// Insert `count` instances after the instance at `after`, or before
    /// the first instance when `after` is `None`.
    pub fn add_instances(&self, after: Option<usize>, count: usize) -> Result<Root> {
        let state = self.uncontrolled_range("add_instances")?;
        let len = state.children.len_untracked();
        let position = match after {
            None => 0,
            Some(index) if index < len => index + 1,
            Some(index) => return Err(EngineError::RepeatIndexOutOfBounds { index, len }),
        };
        let max = self.document().config.max_repeat_count;
        let requested = len.saturating_add(count);
        if requested > max {
            return Err(EngineError::RepeatLimitExceeded {
                reference: untrack(|| self.reference()),
                requested,
                max,
            });
        }

        Runtime::batch(|| untrack(|| self.insert_instances(position, count)))?;
        let reference = untrack(|| self.reference());
        debug!(%reference, position, count, "added repeat instances");
        Ok(self.root())
    }

    /// Remove `count` instances starting at `start`.
    pub fn remove_instances(&self, start: usize, count: usize) -> Result<Root> {
        let state = self.uncontrolled_range("remove_instances")?;
        let len = state.children.len_untracked();
        if count == 0 {
            return Ok(self.root());
        }
        let end = start.saturating_add(count);
        if end > len {
            return Err(EngineError::RepeatIndexOutOfBounds {
                index: end - 1,
                len,
            });
        }

        Runtime::batch(|| untrack(|| self.detach_instances(start, count)))?;
        let reference = untrack(|| self.reference());
        debug!(%reference, start, count, "removed repeat instances");
        Ok(self.root())
    }

    /// Build `count` instances and splice them in at `position`.
    ///
    /// New instances use the authored instance definition for their final
    /// index when there is one, else the template.
    fn insert_instances(&self, position: usize, count: usize) -> Result<()> {
        let state = self.range_state("add_instances")?;
        let definition = self.range_definition()?;
        let NodeDefinitionKind::Repeat {
            template,
            instances: authored,
        } = &definition.kind
        else {
            return Ok(());
        };

        let range = self.handle();
        let mut created = Vec::new();
        for offset in 0..count {
            let index = position + offset;
            let shape = authored.get(index).unwrap_or(template);
            match build_repeat_instance(&range, &definition, Rc::clone(shape), index) {
                Ok(instance) => created.push(instance),
                Err(err) => {
                    for instance in &created {
                        discard(instance);
                    }
                    return Err(err);
                }
            }
        }

        let mut nodes = state.children.nodes_untracked();
        let position = position.min(nodes.len());
        nodes.splice(position..position, created);
        state.children.commit(nodes);
        Ok(())
    }

    /// Remove the contiguous instances `start..start + count`: detach each
    /// subtree depth-first, dispose its scope, then commit once.
    fn detach_instances(&self, start: usize, count: usize) -> Result<()> {
        let state = self.range_state("remove_instances")?;
        let mut nodes = state.children.nodes_untracked();
        let end = (start + count).min(nodes.len());
        let removed: Vec<Node> = nodes.drain(start.min(end)..end).collect();

        for instance in &removed {
            instance.detach();
            instance.scope.dispose()?;
        }
        state.children.commit(nodes);
        Ok(())
    }
}

fn discard(instance: &Node) {
    instance.detach();
    if let Err(err) = instance.scope.dispose() {
        warn!(error = %err, "discarded repeat instance was already disposed");
    }
}
