//! XPath bridge
//!
//! The engine does not implement XPath. It consumes an evaluator through the
//! [`XPathEvaluator`] trait and hands it [`ContextNode`] handles to navigate.
//!
//! Computed node state (relevance, calculations, labels, itemsets) is built
//! with [`create_computed_expression`]: the evaluator's static analysis names
//! the location paths an expression reads, the engine resolves and subscribes
//! to those nodes, and the evaluation itself runs untracked.

mod context;
mod dependency;

use std::rc::Rc;

pub use context::ContextNode;
pub use dependency::{
    create_computed_expression, evaluate_in_context, subscribable_dependencies,
    ComputedExpressionOptions, EvaluationContext, SubscribableDependency,
};

/// Errors reported by an evaluator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XPathError {
    #[error("syntax error in {expression:?}: {message}")]
    Syntax { expression: String, message: String },

    #[error("cannot evaluate {expression:?}: {message}")]
    Evaluation { expression: String, message: String },
}

/// The external XPath evaluator.
///
/// One evaluator serves a whole form. Language state lives in the evaluator
/// because `jr:itext` lookups depend on it.
pub trait XPathEvaluator {
    fn evaluate_boolean(&self, expression: &str, context: &ContextNode) -> Result<bool, XPathError>;

    fn evaluate_string(&self, expression: &str, context: &ContextNode) -> Result<String, XPathError>;

    fn evaluate_nodes(
        &self,
        expression: &str,
        context: &ContextNode,
    ) -> Result<Vec<ContextNode>, XPathError>;

    /// Location paths read by `expression`, as written (relative paths stay
    /// relative).
    fn dependency_references(&self, expression: &str) -> Vec<String>;

    fn languages(&self) -> Vec<String>;

    fn active_language(&self) -> Option<String>;

    fn set_active_language(&self, language: &str);
}

/// Check if an expression looks up translated text.
pub fn is_translated(expression: &str) -> bool {
    expression.contains("jr:itext(")
}

/// Result types a computed expression can produce.
pub trait EvaluationType: Clone + PartialEq + 'static {
    fn evaluate(
        evaluator: &dyn XPathEvaluator,
        expression: &str,
        context: &ContextNode,
    ) -> Result<Self, XPathError>;
}

impl EvaluationType for bool {
    fn evaluate(evaluator: &dyn XPathEvaluator, expression: &str, context: &ContextNode) -> Result<Self, XPathError> {
        evaluator.evaluate_boolean(expression, context)
    }
}

impl EvaluationType for String {
    fn evaluate(evaluator: &dyn XPathEvaluator, expression: &str, context: &ContextNode) -> Result<Self, XPathError> {
        evaluator.evaluate_string(expression, context)
    }
}

impl EvaluationType for Vec<ContextNode> {
    fn evaluate(evaluator: &dyn XPathEvaluator, expression: &str, context: &ContextNode) -> Result<Self, XPathError> {
        evaluator.evaluate_nodes(expression, context)
    }
}

/// Shared evaluator handle.
pub type SharedEvaluator = Rc<dyn XPathEvaluator>;
