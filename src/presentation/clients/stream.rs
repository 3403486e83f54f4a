use super::ClientController;
use crate::domains::interface::{TRead, TWrite};
use crate::domains::query_io::{FrameError, Request, deserialize, parse_request};
use crate::domains::{ConnectionError, IoError, QueryIO};
use bytes::{Buf, BytesMut};
use tracing::{debug, error, info, instrument, warn};

const INITIAL_BUFFER_CAPACITY: usize = 4096;

/// One side of a connection: bytes read so far plus the two halves of the socket.
/// Shared by client connections and the replica's connection to its primary.
pub(crate) struct ClientStream<R, W> {
    pub(crate) r: R,
    pub(crate) w: W,
    buffer: BytesMut,
    pub(crate) peer: String,
}

impl<R, W> ClientStream<R, W>
where
    R: TRead + Send,
    W: TWrite + Send,
{
    pub(crate) fn new(r: R, w: W, peer: impl Into<String>) -> Self {
        Self { r, w, buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY), peer: peer.into() }
    }

    pub(crate) async fn read_request(&mut self) -> Result<Request, ConnectionError> {
        self.read_frame(parse_request).await
    }

    pub(crate) async fn read_reply(&mut self) -> Result<QueryIO, ConnectionError> {
        self.read_frame(deserialize).await
    }

    // Bytes past the decoded frame stay buffered for the next call.
    async fn read_frame<T>(
        &mut self,
        parse: fn(&[u8]) -> Result<(T, usize), FrameError>,
    ) -> Result<T, ConnectionError> {
        loop {
            if !self.buffer.is_empty() {
                match parse(&self.buffer) {
                    | Ok((frame, len)) => {
                        self.buffer.advance(len);
                        return Ok(frame);
                    },
                    | Err(FrameError::Incomplete) => {},
                    | Err(err) => return Err(err.into()),
                }
            }

            if self.r.read_bytes(&mut self.buffer).await? == 0 {
                return Err(ConnectionError::EndOfStream);
            }
        }
    }

    pub(crate) async fn write(&mut self, query_io: QueryIO) -> Result<(), IoError> {
        self.w.write_io(query_io).await
    }

    /// Reads, dispatches and answers requests strictly in order until the peer goes away.
    /// A malformed frame or a malformed PX gets an error reply, then the connection is closed.
    #[instrument(level = tracing::Level::DEBUG, skip(self, controller), fields(peer = %self.peer))]
    pub(crate) async fn handle_client_stream(mut self, controller: ClientController) {
        loop {
            let request = match self.read_request().await {
                | Ok(request) => request,
                | Err(ConnectionError::EndOfStream) => {
                    debug!("connection closed by peer");
                    return;
                },
                | Err(ConnectionError::Io(err)) => {
                    error!("{}", err);
                    return;
                },
                | Err(ConnectionError::Decode(err)) => {
                    warn!("closing connection on malformed frame: {}", err);
                    let _ = self.write(QueryIO::Err(format!("ERR {err}"))).await;
                    return;
                },
            };

            let (reply, must_close) = match request {
                | Request::Inline(text) => (QueryIO::SimpleString(text), false),
                | Request::Command(args) => match controller.dispatch(args).await {
                    | Ok(reply) => (reply, false),
                    | Err(err) => {
                        info!("{}", err);
                        let must_close = err.closes_connection();
                        (QueryIO::Err(err.to_string()), must_close)
                    },
                },
            };

            if let Err(err) = self.write(reply).await {
                error!("failed to write reply: {}", err);
                return;
            }
            if must_close {
                debug!("closing connection after argument error");
                return;
            }
        }
    }
}
