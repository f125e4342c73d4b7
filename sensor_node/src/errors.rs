// thiserror-based error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    /// Reading commands or writing output failed.
    #[error("transport: {0}")]
    Io(#[from] std::io::Error),
    #[error("config: {0}")]
    Config(String),
    #[error("channel '{0}' already has a sampling task")]
    TaskAlreadyAttached(String),
}

impl From<::config::ConfigError> for NodeError {
    fn from(e: ::config::ConfigError) -> Self {
        NodeError::Config(e.to_string())
    }
}

/// A sampling function could not produce a value. Caught inside the sampling
/// task and printed instead of the value; never ends the task.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("raw reading {raw} out of range")]
    OutOfRange { raw: u16 },
    #[error("conversion undefined: {0}")]
    Undefined(&'static str),
    #[error("adc: {0}")]
    Hardware(String),
}
