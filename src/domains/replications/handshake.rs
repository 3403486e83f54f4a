//! Replica side of the replication handshake.
//!
//! ```text
//! replica                         primary
//!   PING                     ->
//!                            <-   +PONG
//!   REPLCONF listening-port  ->
//!                            <-   +OK
//!   REPLCONF capa psync2     ->
//!                            <-   +OK
//!   PSYNC ? -1               ->
//!                            <-   +FULLRESYNC <replid> <offset>
//! ```
//! Any other reply aborts the attempt.
use crate::domains::IoError;
use crate::domains::query_io::{FrameError, QueryIO};
use crate::write_array;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    Ping,
    ListeningPort,
    Capabilities,
    PSync,
}

impl HandshakeStage {
    pub fn request(&self, listening_port: u16) -> QueryIO {
        match self {
            | HandshakeStage::Ping => write_array!("PING"),
            | HandshakeStage::ListeningPort => {
                write_array!("REPLCONF", "listening-port", listening_port.to_string())
            },
            | HandshakeStage::Capabilities => write_array!("REPLCONF", "capa", "psync2"),
            // "?" asks for a full sync since no replication id is known yet; -1 is the offset
            | HandshakeStage::PSync => write_array!("PSYNC", "?", "-1"),
        }
    }

    pub fn accepts(&self, response: &ConnectionResponse) -> bool {
        matches!(
            (self, response),
            (HandshakeStage::Ping, ConnectionResponse::Pong)
                | (HandshakeStage::ListeningPort, ConnectionResponse::Ok)
                | (HandshakeStage::Capabilities, ConnectionResponse::Ok)
                | (HandshakeStage::PSync, ConnectionResponse::FullResync { .. })
        )
    }

    pub fn next(self) -> Option<HandshakeStage> {
        match self {
            | HandshakeStage::Ping => Some(HandshakeStage::ListeningPort),
            | HandshakeStage::ListeningPort => Some(HandshakeStage::Capabilities),
            | HandshakeStage::Capabilities => Some(HandshakeStage::PSync),
            | HandshakeStage::PSync => None,
        }
    }
}

impl Display for HandshakeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            | HandshakeStage::Ping => write!(f, "PING"),
            | HandshakeStage::ListeningPort => write!(f, "REPLCONF listening-port"),
            | HandshakeStage::Capabilities => write!(f, "REPLCONF capa"),
            | HandshakeStage::PSync => write!(f, "PSYNC"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ConnectionResponse {
    Pong,
    Ok,
    FullResync { repl_id: Option<String>, offset: Option<u64> },
    Other(String),
}

impl From<QueryIO> for ConnectionResponse {
    fn from(value: QueryIO) -> Self {
        let line = match value {
            | QueryIO::SimpleString(line) => line,
            | other => return ConnectionResponse::Other(format!("{other:?}")),
        };

        match line.to_lowercase().as_str() {
            | "pong" => ConnectionResponse::Pong,
            | "ok" => ConnectionResponse::Ok,
            | var if var.starts_with("fullresync") => {
                let mut parts = line.split_whitespace().skip(1);
                ConnectionResponse::FullResync {
                    repl_id: parts.next().map(str::to_string),
                    offset: parts.next().and_then(|offset| offset.parse().ok()),
                }
            },
            | _ => ConnectionResponse::Other(line),
        }
    }
}

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("unexpected reply to {stage}: {reply:?}")]
    UnexpectedReply { stage: HandshakeStage, reply: ConnectionResponse },
    #[error("primary closed the connection during {0}")]
    Closed(HandshakeStage),
    #[error("unreadable reply during {stage}: {err}")]
    Decode { stage: HandshakeStage, err: FrameError },
    #[error(transparent)]
    Io(#[from] IoError),
}
