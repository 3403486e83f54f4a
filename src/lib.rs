pub mod adapters;
pub mod domains;
mod init;
pub mod macros;
pub mod presentation;
use anyhow::{Context, Result};
use chrono::Utc;
use domains::IoError;
use domains::caches::cache_manager::CacheManager;
use domains::config_actors::config_manager::ConfigManager;
use domains::replications::controller::ReplicationController;
use domains::saves::snapshot::snapshot_loader::SnapshotLoader;
pub use init::Environment;
use presentation::clients::{ClientController, ClientStream};
use presentation::replications::replica_link::ReplicaLink;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

// Pause after an accept failure that is not about a single connection, e.g. fd exhaustion.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub mod prelude {
    pub use crate::domains::QueryIO;
    pub use crate::domains::query_io::{deserialize, parse_request};
    pub use crate::domains::replications::controller::LinkState;
    pub use crate::domains::replications::state::ReplicationRole;
    pub use anyhow;
    pub use bytes;
    pub use bytes::BytesMut;
    pub use tokio;
}

// * StartUp Facade that wires the subsystems together
#[derive(Clone)]
pub struct StartUpFacade {
    config_manager: ConfigManager,
    cache_manager: CacheManager,
    replication_controller: ReplicationController,
    replica_backoff: Option<Duration>,
}

impl StartUpFacade {
    /// Starts the store and loads the snapshot into it, if one exists.
    /// An unreadable or undecodable snapshot is fatal.
    pub async fn new(env: &Environment) -> Result<Self> {
        let config_manager = ConfigManager::new(
            env.dir.clone(),
            env.dbfilename.clone(),
            env.host.clone(),
            env.port,
        );
        let cache_manager = CacheManager::run_cache_actors();

        if let Some(path) = config_manager.filepath() {
            match SnapshotLoader::load_from_filepath(&path)? {
                | Some(snapshot) => {
                    let summary = cache_manager
                        .apply_snapshot(snapshot, Utc::now())
                        .await
                        .context("failed to apply snapshot")?;
                    info!(
                        path = %path.display(),
                        loaded = summary.loaded,
                        skipped = summary.skipped_expired,
                        "snapshot loaded"
                    );
                },
                | None => info!(path = %path.display(), "no snapshot found, starting empty"),
            }
        }

        Ok(Self {
            config_manager,
            cache_manager,
            replication_controller: ReplicationController::new(env.role.clone()),
            replica_backoff: None,
        })
    }

    /// Overrides the delay between attempts to reach the primary.
    pub fn with_replica_backoff(self, backoff: Duration) -> Self {
        Self { replica_backoff: Some(backoff), ..self }
    }

    pub async fn run(self) -> Result<()> {
        let bind_addr = self.config_manager.bind_addr();
        let listener = TcpListener::bind(&bind_addr)
            .await
            .with_context(|| format!("failed to bind {bind_addr}"))?;
        self.serve(listener).await
    }

    /// Accepts connections on an already bound listener. On a replica the link to the primary
    /// starts first, announcing the port actually bound. Accept failures never end the loop.
    #[instrument(skip_all)]
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!("start listening on {}", local_addr);

        if let Some(primary_addr) = self.replication_controller.role().primary_addr() {
            let link = ReplicaLink::new(primary_addr, local_addr.port(), self.client_controller());
            let link = match self.replica_backoff {
                | Some(backoff) => link.with_backoff(backoff),
                | None => link,
            };
            tokio::spawn(link.run());
        }

        loop {
            match listener.accept().await {
                | Ok((socket, peer_addr)) => {
                    debug!("accepted connection from {}", peer_addr);
                    let (r, w) = socket.into_split();
                    let stream = ClientStream::new(r, w, peer_addr.to_string());
                    tokio::spawn(stream.handle_client_stream(self.client_controller()));
                },
                // a peer that reset before being accepted only loses its own connection
                | Err(err) if IoError::from(err.kind()).should_break() => {
                    debug!("connection dropped before accept: {}", err);
                },
                | Err(err) => {
                    error!("failed to accept connection: {:?}", err);
                    sleep(ACCEPT_ERROR_BACKOFF).await;
                },
            }
        }
    }

    pub fn cache_manager(&self) -> &CacheManager {
        &self.cache_manager
    }

    pub fn replication_controller(&self) -> &ReplicationController {
        &self.replication_controller
    }

    pub(crate) fn client_controller(&self) -> ClientController {
        ClientController {
            cache_manager: self.cache_manager.clone(),
            config_manager: self.config_manager.clone(),
            replication_controller: self.replication_controller.clone(),
        }
    }
}
