use super::cache_db::CacheDb;
use super::command::CacheCommand;
use crate::make_smart_pointer;
use chrono::Utc;
use tokio::sync::mpsc;

pub(crate) struct CacheActor {
    pub(crate) cache: CacheDb,
}

impl CacheActor {
    pub(crate) fn run() -> CacheCommandSender {
        let (tx, cache_actor_inbox) = mpsc::channel(100);
        tokio::spawn(Self { cache: CacheDb::default() }.handle(cache_actor_inbox));
        CacheCommandSender(tx)
    }

    // Commands are applied one at a time, which makes every per-key operation atomic.
    async fn handle(mut self, mut recv: mpsc::Receiver<CacheCommand>) {
        while let Some(command) = recv.recv().await {
            let now = Utc::now();
            match command {
                | CacheCommand::Set { cache_entry, callback } => {
                    self.cache.set(cache_entry);
                    let _ = callback.send(());
                },
                | CacheCommand::Get { key, callback } => {
                    let _ = callback.send(self.cache.get(&key, &now).cloned());
                },
                | CacheCommand::Keys { pattern, callback } => {
                    let _ = callback.send(self.cache.keys(&pattern, &now));
                },
                | CacheCommand::Delete { key, callback } => {
                    let _ = callback.send(self.cache.delete(&key));
                },
                | CacheCommand::Exists { key, callback } => {
                    let _ = callback.send(self.cache.exists(&key, &now));
                },
                | CacheCommand::Count { callback } => {
                    let _ = callback.send(self.cache.count(&now));
                },
            }
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct CacheCommandSender(pub(crate) mpsc::Sender<CacheCommand>);

make_smart_pointer!(CacheCommandSender, mpsc::Sender<CacheCommand>);
