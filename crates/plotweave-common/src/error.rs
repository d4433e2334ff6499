use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum PlotError {
    IoError(std::io::Error),
    /// Rejected area setup (bad sizes, heights or palettes).
    ConfigurationError(String),
    /// A write outside the chunk a scoped view was created for.
    BufferMisuse {
        x: i32,
        y: i32,
        z: i32,
    },
    ForeignGeneratorError(String),
    SinkError(String),
}

impl fmt::Display for PlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotError::IoError(err) => write!(f, "IO error: {}", err),
            PlotError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            PlotError::BufferMisuse { x, y, z } => write!(
                f,
                "Buffer misuse: local position ({}, {}, {}) is outside the chunk",
                x, y, z
            ),
            PlotError::ForeignGeneratorError(msg) => write!(f, "Foreign generator error: {}", msg),
            PlotError::SinkError(msg) => write!(f, "Sink error: {}", msg),
        }
    }
}

impl Error for PlotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PlotError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PlotError {
    fn from(err: std::io::Error) -> Self {
        PlotError::IoError(err)
    }
}

impl From<serde_json::Error> for PlotError {
    fn from(err: serde_json::Error) -> Self {
        PlotError::ConfigurationError(err.to_string())
    }
}
