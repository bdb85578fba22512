//! Wire format of the messages exchanged between the host page and the
//! secondary frame.
//!
//! Messages are JSON objects tagged by `type`:
//!
//! ```text
//! {"type":"sync","time":12.3,"rate":1,"paused":false,"active":true,
//!  "seeking":false,"seekBack":false,"seekForward":false}
//! {"type":"rate","rate":1.5}
//! {"type":"controls","visible":true,"fadeMs":200,"ease":"ease-out"}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

/// Transport state of the primary element at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSample {
    pub time: f64,
    pub rate: f64,
    pub paused: bool,
    pub active: bool,
    pub seeking: bool,
    pub seek_back: bool,
    pub seek_forward: bool,
}

impl SyncSample {
    /// Either force flag is set.
    pub fn forced(&self) -> bool {
        self.seek_back || self.seek_forward
    }
}

/// Visibility of the secondary frame's native control chrome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlsReport {
    pub visible: bool,
    pub fade_ms: f64,
    pub ease: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FrameMessage {
    Sync(SyncSample),
    Rate { rate: f64 },
    Controls(ControlsReport),
}

impl FrameMessage {
    /// Parse and validate a message received as a JSON string.
    pub fn from_json(data: &str) -> AgentResult<Self> {
        let message: FrameMessage =
            serde_json::from_str(data).map_err(|e| AgentError::Protocol(e.to_string()))?;
        message.validate()?;
        Ok(message)
    }

    /// Parse and validate a message received as structured data.
    pub fn from_value(value: serde_json::Value) -> AgentResult<Self> {
        let message: FrameMessage =
            serde_json::from_value(value).map_err(|e| AgentError::Protocol(e.to_string()))?;
        message.validate()?;
        Ok(message)
    }

    pub fn to_json(&self) -> AgentResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reject numbers a media element would not accept.
    pub fn validate(&self) -> AgentResult<()> {
        match self {
            FrameMessage::Sync(sample) => {
                check_time(sample.time)?;
                check_rate(sample.rate)
            }
            FrameMessage::Rate { rate } => check_rate(*rate),
            FrameMessage::Controls(report) => {
                if report.fade_ms.is_finite() && report.fade_ms >= 0.0 {
                    Ok(())
                } else {
                    Err(AgentError::Protocol(format!("bad fade duration {}", report.fade_ms)))
                }
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FrameMessage::Sync(_) => "sync",
            FrameMessage::Rate { .. } => "rate",
            FrameMessage::Controls(_) => "controls",
        }
    }
}

fn check_time(time: f64) -> AgentResult<()> {
    if time.is_finite() && time >= 0.0 {
        Ok(())
    } else {
        Err(AgentError::Protocol(format!("bad time {}", time)))
    }
}

fn check_rate(rate: f64) -> AgentResult<()> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(AgentError::Protocol(format!("bad rate {}", rate)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sync_wire_names() {
        let message = FrameMessage::Sync(SyncSample {
            time: 12.5,
            rate: 1.0,
            paused: false,
            active: true,
            seeking: true,
            seek_back: true,
            seek_forward: false,
        });
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "sync");
        assert_eq!(value["seekBack"], true);
        assert_eq!(value["seekForward"], false);
        assert_eq!(value["time"], 12.5);
    }

    #[test]
    fn test_parse_controls() {
        let message =
            FrameMessage::from_json(r#"{"type":"controls","visible":true,"fadeMs":250,"ease":"linear"}"#)
                .unwrap();
        assert_eq!(
            message,
            FrameMessage::Controls(ControlsReport {
                visible: true,
                fade_ms: 250.0,
                ease: "linear".into(),
            })
        );
    }

    #[test]
    fn test_parse_rate_from_value() {
        let message = FrameMessage::from_value(json!({"type": "rate", "rate": 1.25})).unwrap();
        assert_eq!(message, FrameMessage::Rate { rate: 1.25 });
        assert_eq!(message.kind(), "rate");
    }

    #[test]
    fn test_unknown_type_is_protocol_error() {
        let err = FrameMessage::from_json(r#"{"type":"volume","level":1}"#).unwrap_err();
        assert!(matches!(err, AgentError::Protocol(_)));

        let err = FrameMessage::from_json("not json").unwrap_err();
        assert!(matches!(err, AgentError::Protocol(_)));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let err = FrameMessage::from_value(json!({"type": "sync", "time": 1.0})).unwrap_err();
        assert!(matches!(err, AgentError::Protocol(_)));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(FrameMessage::Rate { rate: 0.0 }.validate().is_err());
        assert!(FrameMessage::from_value(json!({"type": "rate", "rate": -2.0})).is_err());
        let sample = SyncSample {
            time: -1.0,
            rate: 1.0,
            paused: false,
            active: true,
            seeking: false,
            seek_back: false,
            seek_forward: false,
        };
        assert!(FrameMessage::Sync(sample).validate().is_err());
    }
}
