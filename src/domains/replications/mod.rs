pub mod controller;
pub mod handshake;
mod replid_generator;
pub mod state;
