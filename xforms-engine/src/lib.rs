//! XForms Engine
//!
//! This crate provides the runtime behind a form-filling session. It takes a
//! parsed form definition and builds a live instance tree whose state
//! (values, relevance, readonly, required, labels, validation, repeat
//! structure) is kept consistent with XPath bind expressions through
//! fine-grained reactivity.
//!
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects, scopes)
//! - The instance tree and its node kinds
//! - Value codecs between instance strings and runtime values
//! - Validation and submission state
//!
//! XPath itself is not implemented here. Hosts supply an evaluator through
//! [`xpath::XPathEvaluator`].
//!
//! # Architecture
//!
//! - `reactive`: signals, memos, effects and scopes
//! - `graph`: the dependency graph underneath `reactive`
//! - `definition`: the parsed form definition (deserializable from JSON)
//! - `xpath`: the evaluator seam and computed expressions
//! - `codec`: value types and their codecs
//! - `text`: labels, hints and messages
//! - `state`: engine, client and current state
//! - `instance`: the instance tree
//!
//! # Example
//!
//! ```rust,ignore
//! use xforms_engine::{initialize_form, FormDefinition, InitializeFormOptions};
//!
//! let definition = FormDefinition::from_json(json)?;
//! let root = initialize_form(definition, evaluator, InitializeFormOptions::default())?;
//!
//! let age = root.find_node("/data/age").unwrap();
//! age.set_value("12.9")?;
//! assert_eq!(root.instance_xml(), "<data><age>12</age></data>");
//! ```

pub mod codec;
pub mod config;
pub mod definition;
pub mod error;
pub mod graph;
pub mod instance;
pub mod reactive;
pub mod state;
pub mod text;
pub mod xpath;

pub use codec::{InstanceAttachment, RuntimeValue, ValueInput, ValueType};
pub use config::{ConsistencyChecks, EngineConfig, InitializeFormOptions};
pub use definition::FormDefinition;
pub use error::{EngineError, Result};
pub use instance::{initialize_form, InstanceNode, Node, NodeId, NodeType, Root};
pub use xpath::{ContextNode, XPathError, XPathEvaluator};
