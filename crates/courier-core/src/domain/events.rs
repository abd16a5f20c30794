//! Events - UI へ返すログイベント
//!
//! privileged 側から UI 側へのフィードバック経路はこの ADD_LOG だけです。

use serde::{Deserialize, Serialize};

/// 序数で表す重要度（1=error, 2=warning, 3=success）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 1,
    Warning = 2,
    Success = 3,
}

impl LogLevel {
    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Success),
            _ => None,
        }
    }
}

impl Serialize for LogLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = u8::deserialize(deserializer)?;
        Self::from_ordinal(n)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown log level {n}")))
    }
}

/// ADD_LOG の payload。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub attachment: bool,
    pub contact: String,
}

impl LogEvent {
    pub fn success(message: impl Into<String>, contact: impl Into<String>, attachment: bool) -> Self {
        Self {
            level: LogLevel::Success,
            message: message.into(),
            attachment,
            contact: contact.into(),
        }
    }

    pub fn warning(message: impl Into<String>, contact: impl Into<String>, attachment: bool) -> Self {
        Self {
            level: LogLevel::Warning,
            message: message.into(),
            attachment,
            contact: contact.into(),
        }
    }

    pub fn error(message: impl Into<String>, contact: impl Into<String>, attachment: bool) -> Self {
        Self {
            level: LogLevel::Error,
            message: message.into(),
            attachment,
            contact: contact.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_serializes_as_ordinal() {
        let event = LogEvent::success("sent", "5511999990000", true);
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["level"], 3);
        assert_eq!(v["attachment"], true);

        let back: LogEvent = serde_json::from_value(v).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let v = serde_json::json!({"level": 9, "message": "", "attachment": false, "contact": ""});
        assert!(serde_json::from_value::<LogEvent>(v).is_err());
    }
}
