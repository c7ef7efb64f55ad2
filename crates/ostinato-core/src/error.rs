//! Error types for ostinato-core.

use std::path::PathBuf;
use thiserror::Error;

use crate::ids::NodeId;

/// Error type for ostinato-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Packet pool exhausted ({capacity} packets in flight)")]
    PacketPoolExhausted { capacity: usize },

    #[error("Encoded packet of {size} bytes exceeds packet capacity of {capacity} bytes")]
    PacketOverflow { size: usize, capacity: usize },

    #[error("{kind} identifier range [{min}, {max}] exhausted")]
    IdRangeExhausted {
        kind: &'static str,
        min: u32,
        max: u32,
    },

    #[error("{kind} identifier {id} is not allocated")]
    IdNotAllocated { kind: &'static str, id: u32 },

    #[error("{kind} identifier {id} is outside the allocator range")]
    IdOutOfRange { kind: &'static str, id: u32 },

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unbalanced bundle nesting")]
    UnbalancedBundle,

    #[error("Request contains no commands")]
    EmptyRequest,

    #[error("Command queue full")]
    CommandQueueFull,

    #[error("Couldn't open command file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Render aborted after an earlier write failure")]
    RenderAborted,

    #[error("Truncated record in command file")]
    TruncatedRecord,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

impl From<rosc::OscError> for Error {
    fn from(e: rosc::OscError) -> Self {
        Error::Decode(format!("{:?}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PacketPoolExhausted { capacity: 8 };
        assert!(err.to_string().contains("8 packets"));

        let err = Error::IdRangeExhausted {
            kind: "node",
            min: 1,
            max: 1023,
        };
        assert_eq!(err.to_string(), "node identifier range [1, 1023] exhausted");

        let err = Error::IdNotAllocated { kind: "bus", id: 7 };
        assert!(err.to_string().contains("7 is not allocated"));
    }

    #[test]
    fn test_file_open_error_keeps_path() {
        let err = Error::FileOpen {
            path: PathBuf::from("/nonexistent/commands.osc"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/nonexistent/commands.osc"));
    }
}
