//! Specified state: a record of properties classified by how they may be
//! written.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use super::StateValue;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyClassification {
    /// Read and written through accessors owned by the node.
    Mutable,
    /// Derived; read-only.
    Computed,
    /// Fixed at construction.
    Static,
}

impl fmt::Display for PropertyClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mutable => "mutable",
            Self::Computed => "computed",
            Self::Static => "static",
        })
    }
}

type Getter = Box<dyn Fn() -> StateValue>;
type Setter = Box<dyn Fn(StateValue) -> Result<()>>;

/// How one property is read and written.
pub enum PropertySpec {
    Mutable { get: Getter, set: Setter },
    Computed(Getter),
    Static(StateValue),
}

impl PropertySpec {
    pub fn mutable(
        get: impl Fn() -> StateValue + 'static,
        set: impl Fn(StateValue) -> Result<()> + 'static,
    ) -> Self {
        Self::Mutable {
            get: Box::new(get),
            set: Box::new(set),
        }
    }

    pub fn computed(get: impl Fn() -> StateValue + 'static) -> Self {
        Self::Computed(Box::new(get))
    }

    pub fn classification(&self) -> PropertyClassification {
        match self {
            Self::Mutable { .. } => PropertyClassification::Mutable,
            Self::Computed(_) => PropertyClassification::Computed,
            Self::Static(_) => PropertyClassification::Static,
        }
    }
}

impl fmt::Debug for PropertySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            other => f.write_str(match other.classification() {
                PropertyClassification::Mutable => "Mutable",
                _ => "Computed",
            }),
        }
    }
}

/// Ordered property record. Reads of mutable and computed properties are
/// reactive.
#[derive(Debug, Default)]
pub struct SpecifiedState {
    properties: IndexMap<&'static str, PropertySpec>,
}

impl SpecifiedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &'static str, spec: PropertySpec) -> Self {
        self.properties.insert(key, spec);
        self
    }

    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.properties.get(key).map(|spec| match spec {
            PropertySpec::Mutable { get, .. } | PropertySpec::Computed(get) => get(),
            PropertySpec::Static(value) => value.clone(),
        })
    }

    /// Write a mutable property. Computed and static properties reject the
    /// write.
    pub fn set(&self, key: &str, value: StateValue) -> Result<()> {
        match self.properties.get(key) {
            Some(PropertySpec::Mutable { set, .. }) => set(value),
            Some(spec) => Err(EngineError::StateWrite {
                key: key.to_string(),
                classification: spec.classification(),
            }),
            None => Err(EngineError::UnknownProperty {
                key: key.to_string(),
            }),
        }
    }

    pub fn classification(&self, key: &str) -> Option<PropertyClassification> {
        self.properties.get(key).map(PropertySpec::classification)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.properties.keys().copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Current value of every property, in declaration order.
    pub fn snapshot(&self) -> IndexMap<String, StateValue> {
        self.properties
            .keys()
            .filter_map(|key| self.get(key).map(|value| (key.to_string(), value)))
            .collect()
    }
}
