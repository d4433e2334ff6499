use std::fmt;
use std::fmt::{Display, Formatter};

/// Log severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogSeverity {
    /// Parses a level name as found in `PLOTWEAVE_LOG`
    pub fn from_name(name: &str) -> Option<LogSeverity> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogSeverity::Debug),
            "info" => Some(LogSeverity::Info),
            "warn" | "warning" => Some(LogSeverity::Warning),
            "error" => Some(LogSeverity::Error),
            "fatal" => Some(LogSeverity::Fatal),
            _ => None,
        }
    }
}

/// Display impl for LogSeverity
impl Display for LogSeverity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogSeverity::Debug => write!(f, "DEBUG"),
            LogSeverity::Info => write!(f, "INFO"),
            LogSeverity::Warning => write!(f, "WARNING"),
            LogSeverity::Error => write!(f, "ERROR"),
            LogSeverity::Fatal => write!(f, "FATAL"),
        }
    }
}
