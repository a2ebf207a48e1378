//! Event severity definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a shipped event.
///
/// The variants follow the trace-event types an application emits, so the
/// serialized name (`"Error"`, `"Information"`, ...) is what ends up in the
/// `event.severity` field of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Default)]
pub enum Severity {
    Critical,
    Error,
    Warning,
    #[default]
    Information,
    Verbose,
    Start,
    Stop,
    Suspend,
    Resume,
    Transfer,
}

impl Severity {
    pub const ALL: [Severity; 10] = [
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Information,
        Severity::Verbose,
        Severity::Start,
        Severity::Stop,
        Severity::Suspend,
        Severity::Resume,
        Severity::Transfer,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Error => "Error",
            Severity::Warning => "Warning",
            Severity::Information => "Information",
            Severity::Verbose => "Verbose",
            Severity::Start => "Start",
            Severity::Stop => "Stop",
            Severity::Suspend => "Suspend",
            Severity::Resume => "Resume",
            Severity::Transfer => "Transfer",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" | "fatal" => Ok(Severity::Critical),
            "error" => Ok(Severity::Error),
            "warning" | "warn" => Ok(Severity::Warning),
            "information" | "info" => Ok(Severity::Information),
            "verbose" | "debug" | "trace" => Ok(Severity::Verbose),
            "start" => Ok(Severity::Start),
            "stop" => Ok(Severity::Stop),
            "suspend" => Ok(Severity::Suspend),
            "resume" => Ok(Severity::Resume),
            "transfer" => Ok(Severity::Transfer),
            _ => Err(format!("Invalid severity: '{}'", s)),
        }
    }
}
