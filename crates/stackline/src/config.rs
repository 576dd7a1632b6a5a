//! Engine configuration.
//!
//! Every field has a default, so a TOML file only needs to name what it
//! changes:
//!
//! ```
//! use stackline::{EngineConfig, ExcitationRule, UnderflowPolicy};
//!
//! let config: EngineConfig = toml::from_str(r#"
//!     excitation = "OneOrTwo"
//!     max_ticks = 500
//! "#).unwrap();
//! assert_eq!(config.excitation, ExcitationRule::OneOrTwo);
//! assert_eq!(config.underflow, UnderflowPolicy::default());
//! ```

use serde::{Deserialize, Serialize};

use crate::grid::Value;

/// How many simultaneous proposals a target cell tolerates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum ExcitationRule {
    /// Exactly one signal enters; the lowest source wins, the rest are absorbed.
    #[default]
    ExactlyOne,
    /// One or two proposals fire (lowest source wins); three or more
    /// overload the target and every proposal is absorbed.
    OneOrTwo,
}

/// What a landing does when its stack holds too few values.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum UnderflowPolicy {
    /// Missing operands are replaced by the value and the instruction runs.
    Substitute(Value),
    /// The instruction does nothing and emits no signal.
    DestroySignal,
}

impl Default for UnderflowPolicy {
    fn default() -> Self {
        UnderflowPolicy::Substitute(Value::Int(0))
    }
}

/// Engine configuration.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub excitation: ExcitationRule,
    pub underflow: UnderflowPolicy,
    /// Absolute limit on the tick counter for [`crate::Engine::run`] calls
    /// that do not pass their own. `None` runs until halt or cancellation.
    pub max_ticks: Option<u64>,
}

impl EngineConfig {
    #[must_use]
    pub fn with_excitation(mut self, excitation: ExcitationRule) -> Self {
        self.excitation = excitation;
        self
    }

    #[must_use]
    pub fn with_underflow(mut self, underflow: UnderflowPolicy) -> Self {
        self.underflow = underflow;
        self
    }

    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }
}
