//! Central error types for nicofix.
//!
//! Nothing the agent does is fatal to the host page. Errors exist so that
//! each failure can be classified and logged once, then dropped: tick
//! functions absorb them through [`Absorb`] and retry on the next tick.

use thiserror::Error;

/// Main error type for agent operations.
#[derive(Error, Debug)]
pub enum AgentError {
    /// An expected node is not (yet) in the document
    #[error("Node missing: {0}")]
    NodeMissing(&'static str),

    /// The browser rejected a media operation (play, seek, rate change)
    #[error("Media operation `{op}` failed: {reason}")]
    MediaOperation { op: &'static str, reason: String },

    /// A frame's document is not reachable from this origin
    #[error("Cross-origin access denied")]
    CrossOriginDenied,

    /// A message arrived from an origin outside the allow-list
    #[error("Untrusted message origin: {0}")]
    UntrustedOrigin(String),

    /// A message had an unexpected shape or type
    #[error("Protocol mismatch: {0}")]
    Protocol(String),

    /// DOM mutation or query failed
    #[error("DOM error: {0}")]
    Dom(String),

    /// Configuration could not be parsed or contains an invalid pattern
    #[error("Config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    pub fn media(op: &'static str, reason: impl Into<String>) -> Self {
        AgentError::MediaOperation {
            op,
            reason: reason.into(),
        }
    }

    /// Transient absence is expected while the page renders and is not worth
    /// a log line.
    pub fn is_transient(&self) -> bool {
        matches!(self, AgentError::NodeMissing(_))
    }
}

impl From<regex::Error> for AgentError {
    fn from(err: regex::Error) -> Self {
        AgentError::Config(err.to_string())
    }
}

impl From<String> for AgentError {
    fn from(msg: String) -> Self {
        AgentError::Other(msg)
    }
}

impl From<&str> for AgentError {
    fn from(msg: &str) -> Self {
        AgentError::Other(msg.to_string())
    }
}

/// Type alias for Results using AgentError.
pub type AgentResult<T> = Result<T, AgentError>;

/// Extension trait for adding context to Option types.
pub trait OptionExt<T> {
    /// Convert None to [`AgentError::NodeMissing`].
    fn context(self, what: &'static str) -> AgentResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn context(self, what: &'static str) -> AgentResult<T> {
        self.ok_or(AgentError::NodeMissing(what))
    }
}

/// Swallow a failure after logging it.
///
/// Used at every boundary where a failed operation must not abort the
/// surrounding tick.
pub trait Absorb<T> {
    /// Log the error at debug level (transient absence is not logged) and
    /// return the value if there was one.
    fn absorb(self, what: &str) -> Option<T>;
}

impl<T> Absorb<T> for AgentResult<T> {
    fn absorb(self, what: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                if !err.is_transient() {
                    log::debug!("[ABSORB] {}: {}", what, err);
                }
                None
            }
        }
    }
}
