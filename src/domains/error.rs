use crate::domains::query_io::FrameError;
use std::io::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IoError {
    #[error("ConnectionRefused")]
    ConnectionRefused,
    #[error("ConnectionReset")]
    ConnectionReset,
    #[error("ConnectionAborted")]
    ConnectionAborted,
    #[error("NotConnected")]
    NotConnected,
    #[error("BrokenPipe")]
    BrokenPipe,
    #[error("TimedOut")]
    TimedOut,
    #[error("{0}")]
    Custom(String),
}

impl IoError {
    /// The error concerns one connection only: its loop ends, everything else carries on.
    pub fn should_break(&self) -> bool {
        matches!(
            self,
            IoError::ConnectionRefused
                | IoError::ConnectionReset
                | IoError::ConnectionAborted
                | IoError::NotConnected
                | IoError::BrokenPipe
                | IoError::TimedOut
        )
    }
}

pub(crate) fn io_error_from_kind(kind: ErrorKind) -> IoError {
    match kind {
        | ErrorKind::ConnectionRefused => IoError::ConnectionRefused,
        | ErrorKind::ConnectionReset => IoError::ConnectionReset,
        | ErrorKind::ConnectionAborted => IoError::ConnectionAborted,
        | ErrorKind::NotConnected => IoError::NotConnected,
        | ErrorKind::BrokenPipe => IoError::BrokenPipe,
        | ErrorKind::TimedOut => IoError::TimedOut,
        | _ => IoError::Custom(format!("unknown error: {kind:?}")),
    }
}

impl From<ErrorKind> for IoError {
    fn from(value: ErrorKind) -> Self {
        io_error_from_kind(value)
    }
}

impl From<std::io::Error> for IoError {
    fn from(value: std::io::Error) -> Self {
        io_error_from_kind(value.kind())
    }
}

/// Everything that can end a read from a connection.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConnectionError {
    /// The peer closed the stream, possibly in the middle of a frame. Nothing is written back.
    #[error("connection closed by peer")]
    EndOfStream,
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Decode(#[from] FrameError),
}
