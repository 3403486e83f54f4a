use std::path::PathBuf;

/// Parameters readable through `CONFIG GET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigResource {
    Dir,
    DbFileName,
}

impl ConfigResource {
    pub fn from_param(param: &str) -> Option<Self> {
        match param.to_lowercase().as_str() {
            | "dir" => Some(ConfigResource::Dir),
            | "dbfilename" => Some(ConfigResource::DbFileName),
            | _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            | ConfigResource::Dir => "dir",
            | ConfigResource::DbFileName => "dbfilename",
        }
    }
}

/// Settings fixed at start-up and shared read-only with every connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigManager {
    pub(crate) dir: String,
    pub(crate) dbfilename: String,
    pub(crate) host: String,
    pub port: u16,
}

impl ConfigManager {
    pub fn new(dir: String, dbfilename: String, host: String, port: u16) -> Self {
        Self { dir, dbfilename, host, port }
    }

    pub fn get(&self, resource: ConfigResource) -> &str {
        match resource {
            | ConfigResource::Dir => &self.dir,
            | ConfigResource::DbFileName => &self.dbfilename,
        }
    }

    /// `None` unless both the directory and the file name are set.
    pub fn filepath(&self) -> Option<PathBuf> {
        if self.dir.is_empty() || self.dbfilename.is_empty() {
            return None;
        }
        Some(PathBuf::from(&self.dir).join(&self.dbfilename))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
