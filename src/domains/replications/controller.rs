use super::handshake::HandshakeStage;
use super::state::{ReplicationRole, ReplicationState};
use std::sync::Arc;
use tokio::sync::watch;

/// Where this node's link to its primary currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// The node is a primary and has no upstream link.
    Primary,
    ReplicaConnecting,
    ReplicaHandshaking(HandshakeStage),
    ReplicaStreaming,
}

/// Holds the node's replication identity and answers the primary-side commands.
/// On a replica it also publishes the state of the link to the primary.
#[derive(Clone, Debug)]
pub struct ReplicationController {
    state: Arc<ReplicationState>,
    link: Arc<watch::Sender<LinkState>>,
}

impl ReplicationController {
    pub fn new(role: ReplicationRole) -> Self {
        let initial = match role {
            | ReplicationRole::Primary => LinkState::Primary,
            | ReplicationRole::Replica { .. } => LinkState::ReplicaConnecting,
        };
        let (link, _) = watch::channel(initial);
        Self { state: Arc::new(ReplicationState::new(role)), link: Arc::new(link) }
    }

    pub fn role(&self) -> &ReplicationRole {
        &self.state.role
    }

    pub fn replid(&self) -> &str {
        &self.state.replid
    }

    /// INFO body: one `field:value` per line, CRLF separated.
    pub fn info(&self) -> String {
        self.state.info().join("\r\n")
    }

    pub fn full_resync(&self) -> String {
        self.state.full_resync()
    }

    pub fn link_state(&self) -> LinkState {
        *self.link.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.link.subscribe()
    }

    pub(crate) fn set_link_state(&self, link_state: LinkState) {
        self.link.send_replace(link_state);
    }
}
