//! Engine configuration and form initialization options.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EngineError;
use crate::reactive::DEFAULT_MAX_EFFECT_RUNS;
use crate::state::{EngineStateFactory, ReactiveObjectFactory};

/// How detected state inconsistencies are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyChecks {
    Off,
    #[default]
    Warn,
    Panic,
}

impl ConsistencyChecks {
    /// Report a consistency error according to this policy.
    pub(crate) fn report(self, error: EngineError) {
        match self {
            Self::Off => {}
            Self::Warn => warn!(%error, "consistency check failed"),
            Self::Panic => panic!("consistency check failed: {error}"),
        }
    }
}

/// Default cap on the instances of one repeat range.
pub const DEFAULT_MAX_REPEAT_COUNT: usize = 10_000;

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub consistency_checks: ConsistencyChecks,

    /// Cap on effect runs within a single flush.
    pub max_effect_runs: usize,

    /// Cap on the instances of one repeat range. Controlled ranges whose
    /// count goes past it keep their previous count.
    pub max_repeat_count: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            consistency_checks: ConsistencyChecks::default(),
            max_effect_runs: DEFAULT_MAX_EFFECT_RUNS,
            max_repeat_count: DEFAULT_MAX_REPEAT_COUNT,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Options for [`initialize_form`](crate::initialize_form).
#[derive(Clone)]
pub struct InitializeFormOptions {
    pub config: EngineConfig,

    /// Produces the client-observable state object of every node.
    pub state_factory: Rc<dyn ReactiveObjectFactory>,
}

impl Default for InitializeFormOptions {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            state_factory: Rc::new(EngineStateFactory),
        }
    }
}

impl fmt::Debug for InitializeFormOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializeFormOptions")
            .field("config", &self.config)
            .field(
                "engine_compatible_state",
                &self.state_factory.is_engine_compatible(),
            )
            .finish()
    }
}
