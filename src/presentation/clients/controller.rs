use super::request::{ClientAction, CommandError, extract_action};
use crate::domains::QueryIO;
use crate::domains::caches::cache_manager::CacheManager;
use crate::domains::config_actors::config_manager::ConfigManager;
use crate::domains::replications::controller::ReplicationController;
use bytes::Bytes;
use tracing::{debug, instrument};

/// Executes commands against the key space. One clone per connection.
#[derive(Clone, Debug)]
pub(crate) struct ClientController {
    pub(crate) cache_manager: CacheManager,
    pub(crate) config_manager: ConfigManager,
    pub(crate) replication_controller: ReplicationController,
}

impl ClientController {
    #[instrument(level = tracing::Level::DEBUG, skip(self))]
    pub(crate) async fn dispatch(&self, args: Vec<Bytes>) -> Result<QueryIO, CommandError> {
        let action = extract_action(args)?;
        debug!(?action, "dispatching");
        self.handle(action).await
    }

    pub(crate) async fn handle(&self, cmd: ClientAction) -> Result<QueryIO, CommandError> {
        let response = match cmd {
            | ClientAction::Ping => QueryIO::SimpleString("PONG".into()),
            | ClientAction::Echo(val) => QueryIO::BulkString(val),
            | ClientAction::Set { key, value, ttl_millis } => {
                self.cache_manager.route_set(key, value, ttl_millis).await?;
                QueryIO::SimpleString("OK".into())
            },
            | ClientAction::IgnoredSet => QueryIO::SimpleString("OK".into()),
            | ClientAction::Get { key } => self.cache_manager.route_get(key).await?.into(),
            | ClientAction::Delete { keys } => {
                QueryIO::Integer(self.cache_manager.route_delete(keys).await? as i64)
            },
            | ClientAction::Exists { keys } => {
                QueryIO::Integer(self.cache_manager.route_exists(keys).await? as i64)
            },
            | ClientAction::DbSize => {
                QueryIO::Integer(self.cache_manager.route_count().await? as i64)
            },
            | ClientAction::Keys { pattern } => {
                self.cache_manager.route_keys(Some(pattern)).await?.into()
            },
            | ClientAction::Config(resource) => vec![
                resource.name().to_string(),
                self.config_manager.get(resource).to_string(),
            ]
            .into(),
            | ClientAction::Info => self.replication_controller.info().into(),
            | ClientAction::ReplConf => QueryIO::SimpleString("OK".into()),
            | ClientAction::PSync => {
                QueryIO::SimpleString(self.replication_controller.full_resync())
            },
        };

        Ok(response)
    }
}
