//! Body elements: the controls and groupings that present instance nodes.

use serde::{Deserialize, Serialize};

use crate::text::TextDefinition;

/// Label and hint of a control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlText {
    pub label: Option<TextDefinition>,
    pub hint: Option<TextDefinition>,
}

/// A statically authored choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub value: String,
    pub label: TextDefinition,
}

impl ItemDefinition {
    pub fn new(value: impl Into<String>, label: impl Into<TextDefinition>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Choices computed from instance nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsetDefinition {
    /// Node-set expression selecting one node per item.
    pub nodes: String,
    /// Item value, relative to the item node.
    pub value: String,
    /// Item label, relative to the item node.
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectDefinition {
    #[serde(flatten)]
    pub text: ControlText,
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
    #[serde(default)]
    pub itemset: Option<ItemsetDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDefinition {
    #[serde(flatten)]
    pub text: ControlText,
    pub start: f64,
    pub end: f64,
    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_step() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadDefinition {
    #[serde(flatten)]
    pub text: ControlText,
    #[serde(default)]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BodyElement {
    Group {
        #[serde(default)]
        label: Option<TextDefinition>,
    },
    Repeat {
        #[serde(default)]
        label: Option<TextDefinition>,
        #[serde(default)]
        count: Option<String>,
        #[serde(default)]
        no_add_remove: bool,
    },
    Input(ControlText),
    Select1(SelectDefinition),
    Select(SelectDefinition),
    Rank(SelectDefinition),
    Range(RangeDefinition),
    Trigger(ControlText),
    Upload(UploadDefinition),
    #[serde(other)]
    Unrecognized,
}

impl BodyElement {
    /// Label of the element, whatever its kind.
    pub fn label(&self) -> Option<&TextDefinition> {
        match self {
            Self::Group { label } | Self::Repeat { label, .. } => label.as_ref(),
            _ => self.control_text().and_then(|text| text.label.as_ref()),
        }
    }

    pub fn hint(&self) -> Option<&TextDefinition> {
        self.control_text().and_then(|text| text.hint.as_ref())
    }

    fn control_text(&self) -> Option<&ControlText> {
        match self {
            Self::Input(text) | Self::Trigger(text) => Some(text),
            Self::Select1(select) | Self::Select(select) | Self::Rank(select) => Some(&select.text),
            Self::Range(range) => Some(&range.text),
            Self::Upload(upload) => Some(&upload.text),
            Self::Group { .. } | Self::Repeat { .. } | Self::Unrecognized => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Group { .. } => "group",
            Self::Repeat { .. } => "repeat",
            Self::Input(_) => "input",
            Self::Select1(_) => "select1",
            Self::Select(_) => "select",
            Self::Rank(_) => "rank",
            Self::Range(_) => "range",
            Self::Trigger(_) => "trigger",
            Self::Upload(_) => "upload",
            Self::Unrecognized => "unrecognized",
        }
    }
}
