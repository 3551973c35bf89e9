use serde::{Deserialize, Serialize};

use crate::codec::ValueType;
use crate::text::TextDefinition;

/// Bind expressions and data type of a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindDefinition {
    #[serde(rename = "type")]
    pub data_type: ValueType,
    pub calculate: Option<String>,
    pub readonly: Option<String>,
    pub relevant: Option<String>,
    pub required: Option<String>,
    pub constraint: Option<String>,
    pub constraint_msg: Option<TextDefinition>,
    pub required_msg: Option<TextDefinition>,
}

impl BindDefinition {
    pub fn with_type(mut self, data_type: ValueType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_calculate(mut self, expression: impl Into<String>) -> Self {
        self.calculate = Some(expression.into());
        self
    }

    pub fn with_readonly(mut self, expression: impl Into<String>) -> Self {
        self.readonly = Some(expression.into());
        self
    }

    pub fn with_relevant(mut self, expression: impl Into<String>) -> Self {
        self.relevant = Some(expression.into());
        self
    }

    pub fn with_required(mut self, expression: impl Into<String>) -> Self {
        self.required = Some(expression.into());
        self
    }

    pub fn with_constraint(mut self, expression: impl Into<String>) -> Self {
        self.constraint = Some(expression.into());
        self
    }

    pub fn with_constraint_msg(mut self, message: impl Into<TextDefinition>) -> Self {
        self.constraint_msg = Some(message.into());
        self
    }

    pub fn with_required_msg(mut self, message: impl Into<TextDefinition>) -> Self {
        self.required_msg = Some(message.into());
        self
    }

    /// Whether `readonly` is the literal `true()`.
    pub fn is_constant_readonly(&self) -> bool {
        self.readonly
            .as_deref()
            .is_some_and(|expression| expression.trim() == "true()")
    }
}
