use crate::domains::interface::{TRead, TWrite};
use crate::domains::replications::controller::{LinkState, ReplicationController};
use crate::domains::replications::handshake::{ConnectionResponse, HandshakeError, HandshakeStage};
use crate::domains::{ConnectionError, IoError};
use crate::presentation::clients::{ClientController, ClientStream};
use anyhow::Context;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Walks the handshake one stage at a time. Every stage needs its exact expected reply.
pub(crate) async fn make_handshake<R, W>(
    stream: &mut ClientStream<R, W>,
    listening_port: u16,
    replication: &ReplicationController,
) -> Result<(), HandshakeError>
where
    R: TRead + Send,
    W: TWrite + Send,
{
    let mut stage = Some(HandshakeStage::Ping);
    while let Some(current) = stage {
        replication.set_link_state(LinkState::ReplicaHandshaking(current));
        stream.write(current.request(listening_port)).await?;

        let reply = match stream.read_reply().await {
            | Ok(reply) => ConnectionResponse::from(reply),
            | Err(ConnectionError::EndOfStream) => return Err(HandshakeError::Closed(current)),
            | Err(ConnectionError::Io(err)) => return Err(err.into()),
            | Err(ConnectionError::Decode(err)) => {
                return Err(HandshakeError::Decode { stage: current, err });
            },
        };
        if !current.accepts(&reply) {
            return Err(HandshakeError::UnexpectedReply { stage: current, reply });
        }
        if let ConnectionResponse::FullResync { repl_id, offset } = &reply {
            info!(?repl_id, ?offset, "primary accepted full resync");
        }
        debug!(%current, "handshake stage done");
        stage = current.next();
    }
    Ok(())
}

/// The replica's outbound connection. Connects, handshakes, then treats the primary as a
/// client whose commands apply to the local key space. Any failure retries after `backoff`.
pub(crate) struct ReplicaLink {
    primary_addr: String,
    listening_port: u16,
    backoff: Duration,
    client_controller: ClientController,
}

impl ReplicaLink {
    pub(crate) fn new(
        primary_addr: String,
        listening_port: u16,
        client_controller: ClientController,
    ) -> Self {
        Self { primary_addr, listening_port, backoff: DEFAULT_RETRY_BACKOFF, client_controller }
    }

    pub(crate) fn with_backoff(self, backoff: Duration) -> Self {
        Self { backoff, ..self }
    }

    #[instrument(skip_all, fields(primary = %self.primary_addr))]
    pub(crate) async fn run(self) {
        loop {
            match self.connect_once().await {
                | Ok(()) => info!("replication stream from primary ended"),
                | Err(err) => warn!("replication link failed: {:#}", err),
            }
            debug!(backoff = ?self.backoff, "retrying replication link");
            sleep(self.backoff).await;
        }
    }

    async fn connect_once(&self) -> anyhow::Result<()> {
        let replication = &self.client_controller.replication_controller;
        replication.set_link_state(LinkState::ReplicaConnecting);

        let socket = TcpStream::connect(&self.primary_addr)
            .await
            .map_err(IoError::from)
            .with_context(|| format!("failed to connect to primary {}", self.primary_addr))?;
        let (r, w) = socket.into_split();
        let mut stream = ClientStream::new(r, w, self.primary_addr.clone());

        make_handshake(&mut stream, self.listening_port, replication).await?;
        info!("handshake complete, streaming commands from primary");

        replication.set_link_state(LinkState::ReplicaStreaming);
        stream.handle_client_stream(self.client_controller.clone()).await;
        Ok(())
    }
}
