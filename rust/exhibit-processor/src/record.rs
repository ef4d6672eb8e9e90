//! Log records flowing through processors.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ExceptionChain;

/// Severity of a record, least severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::Alert => "ALERT",
            Level::Emergency => "EMERGENCY",
        };
        f.write_str(name)
    }
}

/// A single log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub channel: String,
    pub level: Level,
    pub message: String,
    pub datetime: DateTime<Utc>,
    #[serde(default)]
    pub context: Map<String, Value>,
    /// Exception attached to the entry, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionChain>,
}

impl Record {
    /// A record stamped with the current time and an empty context.
    pub fn new(channel: impl Into<String>, level: Level, message: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            level,
            message: message.into(),
            datetime: Utc::now(),
            context: Map::new(),
            exception: None,
        }
    }

    pub fn with_datetime(mut self, datetime: DateTime<Utc>) -> Self {
        self.datetime = datetime;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_exception(mut self, exception: impl Into<ExceptionChain>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// String value stored in the context under `key`.
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExceptionFrame;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_orders_levels_by_severity() {
        assert!(Level::Debug < Level::Warning);
        assert!(Level::Critical < Level::Emergency);
        assert_eq!(Level::Notice.to_string(), "NOTICE");
    }

    #[test]
    fn it_round_trips_records_through_json() -> Result<(), serde_json::Error> {
        let record = Record::new("app", Level::Error, "payment failed")
            .with_context("order", 42)
            .with_exception(ExceptionFrame::new("RuntimeError", "boom"));

        let json = serde_json::to_value(&record)?;
        assert_eq!(json["level"], "error");
        assert_eq!(json["exception"][0]["kind"], "RuntimeError");

        let decoded: Record = serde_json::from_value(json)?;
        assert_eq!(decoded, record);
        Ok(())
    }
}
