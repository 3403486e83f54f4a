pub mod replica_link;
