//! Agent configuration.
//!
//! Every tunable of the agent lives here: tick intervals, drift tolerances,
//! selectors, origin allow-lists and the regexes the classifiers use. The
//! defaults target the Niconico watch page; a page adapter may override any
//! subset from JSON.
//!
//! ## Layout
//!
//! - `TimingConfig`: one interval per reconciliation timer
//! - `DecisionConfig`: cache TTLs, locale pattern, metrics selectors
//! - `AdConfig`: ad classification, skip behavior, overlay look
//! - `SyncConfig`: drift threshold and seek-intent detection
//! - `FrameConfig`: secondary frame location, origins, control labels

pub mod ads;
pub mod decision;
pub mod frame;
pub mod sync;
pub mod timing;

pub use ads::AdConfig;
pub use decision::DecisionConfig;
pub use frame::FrameConfig;
pub use sync::SyncConfig;
pub use timing::TimingConfig;

use serde::{Deserialize, Serialize};

use crate::error::AgentResult;

/// Complete agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    pub timing: TimingConfig,
    pub decision: DecisionConfig,
    pub ads: AdConfig,
    pub sync: SyncConfig,
    pub frame: FrameConfig,
}

impl AgentConfig {
    /// Parse a (possibly partial) JSON override on top of the defaults.
    pub fn from_json(json: &str) -> AgentResult<Self> {
        let mut config: AgentConfig = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    /// Validate and clamp every section to acceptable ranges.
    pub fn validate(&mut self) {
        self.timing.validate();
        self.decision.validate();
        self.ads.validate();
        self.sync.validate();
        self.frame.validate();
    }
}
