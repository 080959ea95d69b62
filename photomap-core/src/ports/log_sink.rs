//! Log sink port - where operation failures are reported

use serde::{Deserialize, Serialize};

/// Severity of a recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debug" => Some(Severity::Debug),
            "info" => Some(Severity::Info),
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

/// Receiver for failure diagnostics
///
/// Recording must never fail the calling operation, so the method has no
/// return value; sinks swallow their own errors.
pub trait LogSink: Send + Sync {
    fn record(&self, severity: Severity, operation: &str, message: &str);
}

/// Sink that only forwards to `tracing`
///
/// Used when the persistent log cannot be opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, severity: Severity, operation: &str, message: &str) {
        emit_tracing(severity, operation, message);
    }
}

pub(crate) fn emit_tracing(severity: Severity, operation: &str, message: &str) {
    match severity {
        Severity::Debug => tracing::debug!(operation = %operation, "{}", message),
        Severity::Info => tracing::info!(operation = %operation, "{}", message),
        Severity::Warning => tracing::warn!(operation = %operation, "{}", message),
        Severity::Error => tracing::error!(operation = %operation, "{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_roundtrip_and_order() {
        for s in [Severity::Debug, Severity::Info, Severity::Warning, Severity::Error] {
            assert_eq!(Severity::parse(s.as_str()), Some(s));
        }
        assert!(Severity::Warning > Severity::Info);
        assert_eq!(Severity::parse("fine"), None);
    }
}
