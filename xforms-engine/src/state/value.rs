use serde::Serialize;

use crate::codec::RuntimeValue;
use crate::instance::{NodeId, SelectItem};
use crate::text::TextRange;

/// A property value of node state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StateValue {
    Null,
    Boolean(bool),
    String(String),
    Text(TextRange),
    NodeIds(Vec<NodeId>),
    Value(RuntimeValue),
    Options(Vec<SelectItem>),
}

impl StateValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextRange> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_node_ids(&self) -> Option<&[NodeId]> {
        match self {
            Self::NodeIds(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_runtime_value(&self) -> Option<&RuntimeValue> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_options(&self) -> Option<&[SelectItem]> {
        match self {
            Self::Options(options) => Some(options),
            _ => None,
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<TextRange> for StateValue {
    fn from(text: TextRange) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<NodeId>> for StateValue {
    fn from(ids: Vec<NodeId>) -> Self {
        Self::NodeIds(ids)
    }
}

impl From<RuntimeValue> for StateValue {
    fn from(value: RuntimeValue) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<SelectItem>> for StateValue {
    fn from(options: Vec<SelectItem>) -> Self {
        Self::Options(options)
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
