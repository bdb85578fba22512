//! Message origin allow-list.

use crate::error::{AgentError, AgentResult};

/// Exact-match set of origins a receiver accepts messages from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginAllowList {
    origins: Vec<String>,
}

impl OriginAllowList {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let origins = origins
            .into_iter()
            .map(|origin| normalize(origin.as_ref()))
            .filter(|origin| !origin.is_empty() && origin != "*" && origin != "null")
            .collect();
        Self { origins }
    }

    /// Opaque (`null`) and wildcard origins are never allowed.
    pub fn allows(&self, origin: &str) -> bool {
        let origin = normalize(origin);
        self.origins.iter().any(|allowed| *allowed == origin)
    }

    pub fn check(&self, origin: &str) -> AgentResult<()> {
        if self.allows(origin) {
            Ok(())
        } else {
            Err(AgentError::UntrustedOrigin(origin.to_string()))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

fn normalize(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}
