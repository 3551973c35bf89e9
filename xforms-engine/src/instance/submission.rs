//! Submission state and payload preparation.

use serde::Serialize;
use tracing::{debug, warn};

use super::validation::DescendantViolation;
use super::xml::{XmlMode, XmlWriter};
use super::{Node, NodeType};
use crate::definition::{NodeDefinitionRef, SubmissionDefinition};
use crate::reactive::untrack;

/// Submission view of a node.
#[derive(Debug, Clone)]
pub struct SubmissionState {
    node: Node,
}

impl SubmissionState {
    pub(crate) fn new(node: Node) -> Self {
        Self { node }
    }

    /// The node's submission XML: empty when non-relevant, otherwise the
    /// node and its relevant descendants. Reactive.
    pub fn submission_xml(&self) -> String {
        XmlWriter::new(XmlMode::Submission).write(&self.node)
    }
}

/// How the payload is packed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionOptions {
    /// One payload with the instance and every attachment.
    #[default]
    Monolithic,

    /// Payloads of at most `max_size` bytes, each carrying the instance.
    Chunked { max_size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionStatus {
    Ready,
    /// Violations remain; data is still produced.
    Pending,
    MaxSizeExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionAttachment {
    pub name: String,
    pub media_type: String,
    pub size: usize,
    #[serde(skip)]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionData {
    pub instance_xml: String,
    pub attachments: Vec<SubmissionAttachment>,
}

impl SubmissionData {
    /// Bytes this payload carries.
    pub fn size(&self) -> usize {
        self.instance_xml.len() + self.attachments.iter().map(|file| file.size).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    pub definition: SubmissionDefinition,
    pub violations: Vec<DescendantViolation>,
    /// One entry for monolithic submissions, one per chunk otherwise.
    pub data: Vec<SubmissionData>,
}

/// Serialize the tree under `root` for submission. Attachments of relevant
/// upload nodes are renamed `{node_name}-{n}{ext}`, `n` counting from 1.
pub(crate) fn prepare(root: &Node, options: SubmissionOptions) -> SubmissionResult {
    untrack(|| {
        let definition = match root.definition() {
            NodeDefinitionRef::Root(form) => form.submission.clone(),
            _ => SubmissionDefinition::default(),
        };
        let violations = root.validation_state().violations();

        let mut attachments = Vec::new();
        let mut rename = |node: &Node| {
            if node.node_type() != NodeType::Upload {
                return None;
            }
            let file = node.attachment()?;
            let name = format!("{}-{}{}", node.node_name(), attachments.len() + 1, file.extension());
            attachments.push(SubmissionAttachment {
                name: name.clone(),
                media_type: file.media_type,
                size: file.data.len(),
                data: file.data,
            });
            Some(name)
        };
        let instance_xml = XmlWriter::new(XmlMode::Submission)
            .with_rename(&mut rename)
            .write(root);

        let status = if violations.is_empty() {
            SubmissionStatus::Ready
        } else {
            SubmissionStatus::Pending
        };

        let data = match options {
            SubmissionOptions::Monolithic => Some(vec![SubmissionData {
                instance_xml,
                attachments,
            }]),
            SubmissionOptions::Chunked { max_size } => pack(instance_xml, attachments, max_size),
        };

        let result = match data {
            Some(data) => SubmissionResult {
                status,
                definition,
                violations,
                data,
            },
            None => {
                warn!(?options, "submission exceeds the maximum payload size");
                SubmissionResult {
                    status: SubmissionStatus::MaxSizeExceeded,
                    definition,
                    violations,
                    data: Vec::new(),
                }
            }
        };
        debug!(status = ?result.status, chunks = result.data.len(), "prepared submission");
        result
    })
}

/// Greedily pack attachments into chunks that each repeat the instance.
/// `None` when the instance, or the instance with any one attachment, is
/// over `max_size`.
fn pack(
    instance_xml: String,
    attachments: Vec<SubmissionAttachment>,
    max_size: usize,
) -> Option<Vec<SubmissionData>> {
    let base = instance_xml.len();
    if base > max_size || attachments.iter().any(|file| base + file.size > max_size) {
        return None;
    }

    let mut chunks = vec![SubmissionData {
        instance_xml: instance_xml.clone(),
        attachments: Vec::new(),
    }];
    for file in attachments {
        let fits = chunks
            .last()
            .is_some_and(|chunk| chunk.size() + file.size <= max_size);
        if !fits {
            chunks.push(SubmissionData {
                instance_xml: instance_xml.clone(),
                attachments: Vec::new(),
            });
        }
        if let Some(chunk) = chunks.last_mut() {
            chunk.attachments.push(file);
        }
    }
    Some(chunks)
}
