use crate::domains::replications::state::ReplicationRole;
use crate::env_var;
use anyhow::Context;

pub struct Environment {
    pub(crate) role: ReplicationRole,
    pub dir: String,
    pub dbfilename: String,
    pub port: u16,
    pub host: String,
    pub log_level: tracing::Level,
}

impl Environment {
    pub fn init() -> anyhow::Result<Self> {
        Self::from_args(std::env::args().skip(1))
    }

    /// Same as `init`, reading flags from `args` instead of the process arguments.
    pub fn from_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        Self::from_sources(args, |name| std::env::var(name).ok())
    }

    /// Every setting may come from a variable of the same name (`port`, `dir`, `replicaof`, ...)
    /// resolved through `env`. A flag wins over the variable.
    pub fn from_sources(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        env_var!(
            args: args,
            env: env,
            defaults: {
                port: u16 = 6379,
                host: String = "127.0.0.1".to_string(),
                dir: String = ".".to_string(),
                dbfilename: String = "dump.rdb".to_string(),
                log_level: tracing::Level = tracing::Level::INFO,
            },
            optional: {
                replicaof
            }
        );

        let role = match replicaof {
            | Some(replicaof) => Self::parse_replicaof(&replicaof)?,
            | None => ReplicationRole::Primary,
        };

        Ok(Self { role, dir, dbfilename, port, host, log_level })
    }

    // "<host> <port>"
    fn parse_replicaof(replicaof: &str) -> anyhow::Result<ReplicationRole> {
        let parts: Vec<&str> = replicaof.split_whitespace().collect();
        let [primary_host, primary_port] = parts.as_slice() else {
            anyhow::bail!("--replicaof expects \"<host> <port>\", got {replicaof:?}");
        };
        let primary_port = primary_port
            .parse()
            .with_context(|| format!("invalid primary port in --replicaof {replicaof:?}"))?;

        Ok(ReplicationRole::Replica { primary_host: primary_host.to_string(), primary_port })
    }

    pub fn role(&self) -> &ReplicationRole {
        &self.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let env = Environment::from_sources(Vec::new(), vars(&[])).unwrap();

        assert_eq!(env.port, 6379);
        assert_eq!(env.host, "127.0.0.1");
        assert_eq!(env.dir, ".");
        assert_eq!(env.dbfilename, "dump.rdb");
        assert_eq!(env.log_level, tracing::Level::INFO);
    }

    #[test]
    fn test_flags_override_defaults() {
        let env = Environment::from_args(args(&[
            "--dir",
            "/tmp/redis-files",
            "--dbfilename",
            "snap.rdb",
            "--port",
            "6380",
            "--replicaof",
            "localhost 6379",
            "--log_level",
            "debug",
        ]))
        .unwrap();

        assert_eq!(env.dir, "/tmp/redis-files");
        assert_eq!(env.dbfilename, "snap.rdb");
        assert_eq!(env.port, 6380);
        assert_eq!(env.log_level, tracing::Level::DEBUG);
        assert_eq!(
            env.role(),
            &ReplicationRole::Replica { primary_host: "localhost".into(), primary_port: 6379 }
        );
    }

    #[test]
    fn test_malformed_values_are_fatal() {
        assert!(Environment::from_args(args(&["--port", "not-a-port"])).is_err());
        assert!(Environment::from_args(args(&["--port"])).is_err());
        assert!(Environment::from_args(args(&["--replicaof", "localhost"])).is_err());
        assert!(Environment::from_args(args(&["--replicaof", "localhost abc"])).is_err());
        assert!(Environment::from_args(args(&["--replicaof", "localhost:6379"])).is_err());
    }

    #[test]
    fn test_settings_read_from_environment() {
        // GIVEN
        let env = vars(&[
            ("port", "7000"),
            ("dir", "/data"),
            ("dbfilename", "env.rdb"),
            ("host", "0.0.0.0"),
            ("log_level", "warn"),
            ("replicaof", "primary 6379"),
        ]);

        // WHEN
        let env = Environment::from_sources(Vec::new(), env).unwrap();

        // THEN
        assert_eq!(env.port, 7000);
        assert_eq!(env.dir, "/data");
        assert_eq!(env.dbfilename, "env.rdb");
        assert_eq!(env.host, "0.0.0.0");
        assert_eq!(env.log_level, tracing::Level::WARN);
        assert_eq!(
            env.role(),
            &ReplicationRole::Replica { primary_host: "primary".into(), primary_port: 6379 }
        );
    }

    #[test]
    fn test_flags_win_over_environment() {
        let env = Environment::from_sources(
            args(&["--port", "6390", "--dir", "/flag"]),
            vars(&[("port", "7000"), ("dir", "/data")]),
        )
        .unwrap();

        assert_eq!(env.port, 6390);
        assert_eq!(env.dir, "/flag");
    }

    #[test]
    fn test_malformed_environment_value_is_fatal() {
        let err = Environment::from_sources(Vec::new(), vars(&[("port", "not-a-port")]))
            .err()
            .unwrap();

        assert!(err.to_string().contains("environment variable port"), "{err}");
    }
}
