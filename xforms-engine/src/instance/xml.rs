//! Instance XML serialization.

use std::borrow::Cow;
use std::fmt::Write;

use super::{InstanceNode, Node, NodeType};
use crate::definition::NodeDefinitionRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XmlMode {
    /// Every node, relevant or not.
    Instance,
    /// Non-relevant nodes are left out.
    Submission,
}

/// Serializes a subtree. `rename` may substitute the value written for a
/// value node (attachment names during submission).
pub(crate) struct XmlWriter<'a> {
    mode: XmlMode,
    rename: Option<&'a mut dyn FnMut(&Node) -> Option<String>>,
    out: String,
}

impl<'a> XmlWriter<'a> {
    pub(crate) fn new(mode: XmlMode) -> Self {
        Self {
            mode,
            rename: None,
            out: String::new(),
        }
    }

    pub(crate) fn with_rename(mut self, rename: &'a mut dyn FnMut(&Node) -> Option<String>) -> Self {
        self.rename = Some(rename);
        self
    }

    pub(crate) fn write(mut self, node: &Node) -> String {
        self.write_node(node);
        self.out
    }

    fn write_node(&mut self, node: &Node) {
        if self.mode == XmlMode::Submission && !node.is_relevant() {
            return;
        }

        if node.node_type().is_repeat_range() {
            for instance in node.child_nodes() {
                self.write_node(&instance);
            }
            return;
        }

        let name = node.node_name();
        self.out.push('<');
        self.out.push_str(name);
        if node.node_type() == NodeType::Root {
            self.write_root_attributes(node);
        }
        self.out.push('>');

        if node.is_value_node() {
            let value = match self.rename.as_mut().and_then(|rename| rename(node)) {
                Some(renamed) => renamed,
                None => node.instance_value(),
            };
            self.out.push_str(&escape_text(&value));
        } else {
            for child in node.child_nodes() {
                self.write_node(&child);
            }
        }

        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    fn write_root_attributes(&mut self, node: &InstanceNode) {
        let NodeDefinitionRef::Root(form) = node.definition() else {
            return;
        };
        for (prefix, uri) in &form.root.namespaces {
            let uri = escape_attribute(uri);
            // Writing to a String cannot fail.
            let _ = if prefix.is_empty() {
                write!(self.out, r#" xmlns="{uri}""#)
            } else {
                write!(self.out, r#" xmlns:{prefix}="{uri}""#)
            };
        }
        for (name, value) in &form.root.attributes {
            let _ = write!(self.out, r#" {name}="{}""#, escape_attribute(value));
        }
    }
}

pub(crate) fn escape_text(value: &str) -> Cow<'_, str> {
    escape(value, false)
}

pub(crate) fn escape_attribute(value: &str) -> Cow<'_, str> {
    escape(value, true)
}

fn escape(value: &str, attribute: bool) -> Cow<'_, str> {
    let needs_escape = |c: char| matches!(c, '&' | '<' | '>') || (attribute && matches!(c, '"' | '\''));
    if !value.chars().any(needs_escape) {
        return Cow::Borrowed(value);
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            '\'' if attribute => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
