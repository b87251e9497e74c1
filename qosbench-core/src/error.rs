use std::fmt;

/// Result type alias for qosbench core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for qosbench core operations
#[derive(Debug)]
pub enum Error {
    /// I/O errors from trace files and exporters
    Io(std::io::Error),

    /// Configuration errors (unknown distribution, invalid bounds)
    Config(String),

    /// Malformed trace lines or QoS wire strings
    Parse(String),

    /// Other errors
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
            Error::Parse(msg) => write!(f, "Parse error: {msg}"),
            Error::Other(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
