// ABOUTME: SMPP client error types shared by the session, keep-alive and bind helpers
// ABOUTME: Converts I/O and codec failures into one error enum with a Result alias

use crate::codec::CodecError;
use crate::datatypes::{CommandId, CommandStatus};
use std::io;
use thiserror::Error;

/// Error type for SMPP client operations
#[derive(Debug, Error)]
pub enum SmppError {
    /// I/O error during network operations (connection, read, write)
    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),

    /// SMPP protocol error indicated by command_status field
    #[error("Protocol error: {0}")]
    Protocol(CommandStatus),

    /// Data validation error
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// No response arrived before the deadline
    #[error("Operation timeout")]
    Timeout,

    /// Unexpected PDU received (wrong response type for request)
    #[error("Unexpected PDU: expected {expected:?}, got {actual:?}")]
    UnexpectedPdu {
        expected: CommandId,
        actual: CommandId,
    },

    /// The session ended, or the peer closed the connection
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid client state: {0}")]
    InvalidState(String),

    /// Sequence number outside 1..=0x7FFFFFFF
    #[error("Invalid sequence number: {0:#x}")]
    InvalidSequence(u32),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result type alias for SMPP operations
pub type SmppResult<T> = Result<T, SmppError>;

impl SmppError {
    /// Map transport errors that mean the peer is gone to `ConnectionClosed`.
    pub(crate) fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected => SmppError::ConnectionClosed,
            _ => SmppError::Connection(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_like_errors_are_connection_closed() {
        let err = SmppError::from_io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, SmppError::ConnectionClosed));

        let err = SmppError::from_io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, SmppError::Connection(_)));
    }

    #[test]
    fn protocol_error_names_status() {
        let err = SmppError::Protocol(CommandStatus::BindFailed);
        assert_eq!(err.to_string(), "Protocol error: BindFailed (0x0000000d)");
    }
}
