pub mod clients;
pub mod replications;
