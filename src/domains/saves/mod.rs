pub mod endec;
pub mod snapshot;
