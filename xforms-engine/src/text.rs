//! Text ranges
//!
//! Labels, hints, item labels and validation messages are made of chunks:
//! static text, `<output>` expressions, and translated (`jr:itext`) lookups.
//! The definition side is [`TextDefinition`]; the evaluated form is
//! [`TextRange`].

use std::fmt;
use std::rc::Weak;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::reactive::Memo;
use crate::xpath::{evaluate_in_context, ContextNode, EvaluationContext};

/// One authored piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum TextChunkDefinition {
    Static { value: String },
    Output { expression: String },
    Translation { expression: String },
}

/// Authored text. Deserializes from a plain string or a chunk list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TextDefinitionRepr", into = "Vec<TextChunkDefinition>")]
pub struct TextDefinition {
    pub chunks: Vec<TextChunkDefinition>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextDefinitionRepr {
    Literal(String),
    Chunks(Vec<TextChunkDefinition>),
}

impl From<TextDefinitionRepr> for TextDefinition {
    fn from(repr: TextDefinitionRepr) -> Self {
        match repr {
            TextDefinitionRepr::Literal(value) => Self::literal(value),
            TextDefinitionRepr::Chunks(chunks) => Self { chunks },
        }
    }
}

impl From<TextDefinition> for Vec<TextChunkDefinition> {
    fn from(definition: TextDefinition) -> Self {
        definition.chunks
    }
}

impl TextDefinition {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            chunks: vec![TextChunkDefinition::Static {
                value: value.into(),
            }],
        }
    }

    /// A single `jr:itext` lookup.
    pub fn translation(expression: impl Into<String>) -> Self {
        Self {
            chunks: vec![TextChunkDefinition::Translation {
                expression: expression.into(),
            }],
        }
    }

    pub fn is_static(&self) -> bool {
        self.chunks
            .iter()
            .all(|chunk| matches!(chunk, TextChunkDefinition::Static { .. }))
    }
}

impl From<&str> for TextDefinition {
    fn from(value: &str) -> Self {
        Self::literal(value)
    }
}

/// What a text range is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextRole {
    Label,
    Hint,
    ItemLabel,
    ConstraintMsg,
    RequiredMsg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    Static,
    Output,
    Translation,
}

/// One evaluated piece of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextChunk {
    pub source: TextSource,
    pub text: String,
}

/// Evaluated text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRange {
    pub role: TextRole,
    pub chunks: Vec<TextChunk>,
}

impl TextRange {
    pub fn new(role: TextRole, chunks: Vec<TextChunk>) -> Self {
        Self { role, chunks }
    }

    /// Concatenated text of all chunks.
    pub fn as_string(&self) -> String {
        self.chunks.iter().map(|chunk| chunk.text.as_str()).collect()
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in &self.chunks {
            f.write_str(&chunk.text)?;
        }
        Ok(())
    }
}

/// Evaluate `definition` in the current tracking context.
pub(crate) fn evaluate_text<C>(
    context: &C,
    context_node: &ContextNode,
    role: TextRole,
    definition: &TextDefinition,
) -> TextRange
where
    C: EvaluationContext + ?Sized,
{
    let chunks = definition
        .chunks
        .iter()
        .map(|chunk| match chunk {
            TextChunkDefinition::Static { value } => TextChunk {
                source: TextSource::Static,
                text: value.clone(),
            },
            TextChunkDefinition::Output { expression } => TextChunk {
                source: TextSource::Output,
                text: evaluate_chunk(context, context_node, expression),
            },
            TextChunkDefinition::Translation { expression } => TextChunk {
                source: TextSource::Translation,
                text: evaluate_chunk(context, context_node, expression),
            },
        })
        .collect();

    TextRange::new(role, chunks)
}

fn evaluate_chunk<C>(context: &C, context_node: &ContextNode, expression: &str) -> String
where
    C: EvaluationContext + ?Sized,
{
    evaluate_in_context::<String, C>(context, context_node, expression).unwrap_or_else(|err| {
        error!(expression, error = %err, "text evaluation failed");
        String::new()
    })
}

/// Memo of `definition` evaluated against `context`; `None` once the
/// context is detached.
pub(crate) fn create_text_range<C>(
    context: Weak<C>,
    role: TextRole,
    definition: TextDefinition,
) -> Memo<Option<TextRange>>
where
    C: EvaluationContext + ?Sized + 'static,
{
    Memo::with_fallback(None, move || {
        let context = context.upgrade()?;
        if !context.is_attached() {
            return None;
        }
        context.context_reference();
        Some(evaluate_text(&*context, &context.context_node(), role, &definition))
    })
}
