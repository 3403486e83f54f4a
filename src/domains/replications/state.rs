use super::replid_generator::generate_replid;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationRole {
    Primary,
    Replica { primary_host: String, primary_port: u16 },
}

impl ReplicationRole {
    pub fn primary_addr(&self) -> Option<String> {
        match self {
            | ReplicationRole::Primary => None,
            | ReplicationRole::Replica { primary_host, primary_port } => {
                Some(format!("{primary_host}:{primary_port}"))
            },
        }
    }
}

// Spelled the way redis clients expect to read them from INFO.
impl Display for ReplicationRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            | ReplicationRole::Primary => write!(f, "master"),
            | ReplicationRole::Replica { .. } => write!(f, "slave"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationState {
    pub role: ReplicationRole,
    pub replid: String,
    pub repl_offset: u64,
}

impl ReplicationState {
    pub fn new(role: ReplicationRole) -> Self {
        Self { role, replid: generate_replid(), repl_offset: 0 }
    }

    pub fn info(&self) -> Vec<String> {
        vec![
            format!("role:{}", self.role),
            "connected_slaves:0".to_string(),
            format!("master_replid:{}", self.replid),
            format!("master_repl_offset:{}", self.repl_offset),
        ]
    }

    pub fn full_resync(&self) -> String {
        format!("FULLRESYNC {} {}", self.replid, self.repl_offset)
    }
}
