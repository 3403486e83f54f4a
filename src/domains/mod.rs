pub mod caches;
pub mod config_actors;
pub mod error;
pub mod interface;
pub mod query_io;
pub mod replications;
pub mod saves;

pub use error::{ConnectionError, IoError};
pub use query_io::QueryIO;
