pub(crate) mod actor;
pub(crate) mod cache_db;
pub mod cache_manager;
pub mod cache_objects;
pub(crate) mod command;
pub mod pattern;
