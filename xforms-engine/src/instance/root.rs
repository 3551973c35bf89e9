//! The form root and form initialization.

use std::ops::Deref;
use std::rc::Rc;

use tracing::debug;

use super::children::build_root;
use super::submission::{self, SubmissionOptions, SubmissionResult};
use super::xml::{XmlMode, XmlWriter};
use super::Node;
use crate::config::{EngineConfig, InitializeFormOptions};
use crate::definition::FormDefinition;
use crate::error::Result;
use crate::reactive::{untrack, Runtime, Signal};
use crate::state::{ReactiveObjectFactory, StateValue};
use crate::xpath::XPathEvaluator;

/// Per-form data shared by every node.
pub(crate) struct FormDocument {
    pub(crate) definition: Rc<FormDefinition>,
    pub(crate) evaluator: Rc<dyn XPathEvaluator>,
    pub(crate) config: EngineConfig,
    pub(crate) state_factory: Rc<dyn ReactiveObjectFactory>,
    pub(crate) active_language: Signal<Option<String>>,
}

/// Build the instance tree of `definition`.
///
/// Fails when the definition pairs a control with a value type it cannot
/// hold, or has a shape no node kind can be built from.
pub fn initialize_form(
    definition: impl Into<Rc<FormDefinition>>,
    evaluator: Rc<dyn XPathEvaluator>,
    options: InitializeFormOptions,
) -> Result<Root> {
    let InitializeFormOptions {
        config,
        state_factory,
    } = options;
    Runtime::set_max_effect_runs(config.max_effect_runs);

    let document = Rc::new(FormDocument {
        definition: definition.into(),
        active_language: Signal::new(evaluator.active_language()),
        evaluator,
        config,
        state_factory,
    });

    let root = Runtime::batch(|| untrack(|| build_root(&document)))?;
    debug!(
        title = %document.definition.title,
        root = %root.node_id(),
        "initialized form"
    );
    Ok(Root::from_node(root))
}

/// Handle to the root node of a form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Root {
    node: Node,
}

impl Deref for Root {
    type Target = Node;

    fn deref(&self) -> &Self::Target {
        &self.node
    }
}

impl Root {
    pub(crate) fn from_node(node: Node) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn form_definition(&self) -> &FormDefinition {
        &self.node.document.definition
    }

    /// Languages offered by the form.
    pub fn languages(&self) -> Vec<String> {
        self.node.document.evaluator.languages()
    }

    /// Reactive.
    pub fn active_language(&self) -> Option<String> {
        self.node.document.active_language.get()
    }

    /// Switch the active language. Translated text re-evaluates.
    pub fn set_language(&self, language: &str) -> Result<Root> {
        Runtime::batch(|| {
            self.node
                .engine_state()
                .set("active_language", StateValue::from(language))
        })?;
        Ok(self.clone())
    }

    /// Serialize and pack the form for submission.
    pub async fn prepare_submission(&self, options: SubmissionOptions) -> SubmissionResult {
        submission::prepare(&self.node, options)
    }

    /// The whole instance, including non-relevant nodes.
    pub fn instance_xml(&self) -> String {
        untrack(|| XmlWriter::new(XmlMode::Instance).write(&self.node))
    }

    /// The attached node whose reference is `reference`.
    pub fn find_node(&self, reference: &str) -> Option<Node> {
        untrack(|| {
            let mut found = None;
            self.node.walk(&mut |node| {
                if found.is_none() && node.reference() == reference {
                    found = Some(node.clone());
                }
            });
            found
        })
    }

    /// Tear down the tree. Every node becomes detached and every
    /// computation is disposed.
    pub fn dispose(&self) -> Result<()> {
        self.node.detach();
        self.node.scope().dispose()?;
        debug!(root = %self.node.node_id(), "disposed form");
        Ok(())
    }
}
