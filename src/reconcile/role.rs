//! Which part of the site the agent is running in.

use regex::Regex;
use serde::Serialize;

use crate::config::AgentConfig;
use crate::dom::PageLocation;
use crate::error::AgentResult;
use crate::sync::OriginAllowList;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentRole {
    /// The watch page: decision, ads, sync producer, relocation.
    Watch,
    /// The embedded player frame: sync consumer, ads, controls reporter.
    Secondary,
    /// An ad iframe: skip clicker and dimming only.
    AdFrame,
}

impl AgentRole {
    /// `None` when the location is none of the three.
    pub fn detect(location: &PageLocation, config: &AgentConfig) -> AgentResult<Option<Self>> {
        let ad_host = Regex::new(&config.ads.frame_host_pattern)?;
        let ad_path = Regex::new(&config.ads.frame_path_pattern)?;
        if ad_host.is_match(&location.host) && ad_path.is_match(&location.path) {
            return Ok(Some(AgentRole::AdFrame));
        }

        let secondary_host = Regex::new(&config.frame.secondary_host_pattern)?;
        if secondary_host.is_match(&location.host) {
            return Ok(Some(AgentRole::Secondary));
        }

        if OriginAllowList::new(&config.frame.host_origins).allows(&location.origin) {
            return Ok(Some(AgentRole::Watch));
        }
        Ok(None)
    }
}
