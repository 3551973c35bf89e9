//! Evaluation contexts and computed expressions.

use std::rc::{Rc, Weak};

use tracing::{error, warn};

use super::{is_translated, ContextNode, EvaluationType, XPathEvaluator};
use crate::reactive::{untrack, Memo};

/// Something an expression can be evaluated against.
pub trait EvaluationContext {
    /// The node handed to the evaluator as context.
    fn context_node(&self) -> ContextNode;

    /// Absolute location path of the context. Reactive.
    fn context_reference(&self) -> String;

    fn evaluator(&self) -> Rc<dyn XPathEvaluator>;

    /// Whether the context is still part of a live tree.
    fn is_attached(&self) -> bool;

    /// The form's active language. Reactive.
    fn active_language(&self) -> Option<String>;

    /// Resolve a location path relative to this context into the nodes a
    /// computation must subscribe to.
    fn get_subscribable_dependencies_by_reference(&self, reference: &str) -> Vec<ContextNode> {
        subscribable_dependencies(&*self.evaluator(), reference, &self.context_node())
    }
}

/// A node whose state a computation can depend on.
pub trait SubscribableDependency {
    /// Read, within the current tracking context, the state that defines
    /// this node's XPath value.
    fn subscribe(&self);
}

impl SubscribableDependency for ContextNode {
    fn subscribe(&self) {
        match self {
            Self::Instance(node) | Self::RepeatAnchor(node) => node.subscribe(),
            Self::Foreign(_) => {}
        }
    }
}

/// Resolve `reference` against `context`. Unresolvable references are
/// logged and contribute nothing.
pub fn subscribable_dependencies(
    evaluator: &dyn XPathEvaluator,
    reference: &str,
    context: &ContextNode,
) -> Vec<ContextNode> {
    match evaluator.evaluate_nodes(reference, context) {
        Ok(nodes) => nodes,
        Err(err) => {
            warn!(reference, error = %err, "cannot resolve dependency reference");
            Vec::new()
        }
    }
}

/// Subscribe to everything `expression` reads, then evaluate it untracked
/// with `context_node` as context.
pub fn evaluate_in_context<T, C>(
    context: &C,
    context_node: &ContextNode,
    expression: &str,
) -> Result<T, super::XPathError>
where
    T: EvaluationType,
    C: EvaluationContext + ?Sized,
{
    let evaluator = context.evaluator();

    for reference in evaluator.dependency_references(expression) {
        for dependency in subscribable_dependencies(&*evaluator, &reference, context_node) {
            dependency.subscribe();
        }
    }

    if is_translated(expression) {
        context.active_language();
    }

    untrack(|| T::evaluate(&*evaluator, expression, context_node))
}

/// Options for [`create_computed_expression`].
#[derive(Debug, Clone)]
pub struct ComputedExpressionOptions<T> {
    /// Result while the context is detached or gone, and after an
    /// evaluation error.
    pub default_value: T,
}

impl<T> ComputedExpressionOptions<T> {
    pub fn new(default_value: T) -> Self {
        Self { default_value }
    }
}

/// Build a memo evaluating `expression` against `context`.
///
/// The memo holds the context weakly. It re-evaluates when the context's
/// reference changes, when any node the expression reads changes, and for
/// translated expressions when the active language changes.
pub fn create_computed_expression<C, T>(
    context: Weak<C>,
    expression: impl Into<String>,
    options: ComputedExpressionOptions<T>,
) -> Memo<T>
where
    C: EvaluationContext + ?Sized + 'static,
    T: EvaluationType,
{
    let expression = expression.into();
    let default_value = options.default_value;

    Memo::with_fallback(default_value.clone(), move || {
        let Some(context) = context.upgrade() else {
            return default_value.clone();
        };
        if !context.is_attached() {
            return default_value.clone();
        }

        let reference = context.context_reference();
        match evaluate_in_context::<T, C>(&context, &context.context_node(), &expression) {
            Ok(value) => value,
            Err(err) => {
                error!(%reference, expression = %expression, error = %err, "expression evaluation failed");
                default_value.clone()
            }
        }
    })
}
