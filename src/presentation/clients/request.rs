use crate::domains::config_actors::config_manager::ConfigResource;
use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientAction {
    Ping,
    Echo(Bytes),
    /// `ttl_millis == 0` stores without expiry.
    Set { key: Bytes, value: Bytes, ttl_millis: i64 },
    /// A SET whose shape matches neither `key value` nor `key value PX n`. Replies OK, writes nothing.
    IgnoredSet,
    Get { key: Bytes },
    Delete { keys: Vec<Bytes> },
    Exists { keys: Vec<Bytes> },
    DbSize,
    Keys { pattern: Bytes },
    Config(ConfigResource),
    Info,
    ReplConf,
    PSync,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),
    #[error("ERR unknown subcommand '{0}' for 'config' command")]
    UnknownSubcommand(String),
    #[error("ERR unsupported CONFIG parameter: {0}")]
    UnknownConfig(String),
    #[error("ERR value is not a valid PX milliseconds: {0}")]
    InvalidExpiry(String),
    #[error("ERR {0}")]
    Internal(String),
}

impl CommandError {
    /// Only a malformed PX ends the connection; every other argument error keeps it open.
    pub fn closes_connection(&self) -> bool {
        matches!(self, CommandError::InvalidExpiry(_))
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(value: anyhow::Error) -> Self {
        CommandError::Internal(value.to_string())
    }
}

// Verbs, options and error messages are text; a stray invalid byte shows up as U+FFFD.
fn text(arg: &[u8]) -> String {
    String::from_utf8_lossy(arg).into_owned()
}

/// Turns a decoded request array into an action. The verb is case-insensitive.
pub fn extract_action(args: Vec<Bytes>) -> Result<ClientAction, CommandError> {
    let mut args = args.into_iter();
    let Some(verb) = args.next() else {
        return Err(CommandError::UnknownCommand(String::new()));
    };
    let args: Vec<Bytes> = args.collect();
    let verb = text(&verb);
    let cmd = verb.to_uppercase();

    let require_exact_args = |count: usize| {
        if args.len() != count {
            Err(CommandError::WrongArity(cmd.to_lowercase()))
        } else {
            Ok(())
        }
    };
    let require_non_empty_args = || {
        if args.is_empty() { Err(CommandError::WrongArity(cmd.to_lowercase())) } else { Ok(()) }
    };

    let action = match cmd.as_str() {
        | "PING" => ClientAction::Ping,
        | "ECHO" => ClientAction::Echo(Bytes::from(args.concat::<u8>())),
        | "SET" => extract_set(args)?,
        | "GET" => {
            require_exact_args(1)?;
            ClientAction::Get { key: args[0].clone() }
        },
        | "DEL" => {
            require_non_empty_args()?;
            ClientAction::Delete { keys: args }
        },
        | "EXISTS" => {
            require_non_empty_args()?;
            ClientAction::Exists { keys: args }
        },
        | "DBSIZE" => {
            require_exact_args(0)?;
            ClientAction::DbSize
        },
        | "KEYS" => {
            require_exact_args(1)?;
            ClientAction::Keys { pattern: args[0].clone() }
        },
        | "CONFIG" => {
            if args.len() < 2 {
                return Err(CommandError::WrongArity(cmd.to_lowercase()));
            }
            if !args[0].eq_ignore_ascii_case(b"GET") {
                return Err(CommandError::UnknownSubcommand(text(&args[0])));
            }
            let param = text(&args[1]);
            let resource = ConfigResource::from_param(&param)
                .ok_or(CommandError::UnknownConfig(param))?;
            ClientAction::Config(resource)
        },
        // a section argument such as `INFO replication` is accepted and ignored
        | "INFO" => ClientAction::Info,
        | "REPLCONF" => ClientAction::ReplConf,
        | "PSYNC" => ClientAction::PSync,
        | _ => return Err(CommandError::UnknownCommand(verb)),
    };
    Ok(action)
}

fn extract_set(args: Vec<Bytes>) -> Result<ClientAction, CommandError> {
    match <[Bytes; 2]>::try_from(args) {
        | Ok([key, value]) => Ok(ClientAction::Set { key, value, ttl_millis: 0 }),
        | Err(args) => match <[Bytes; 4]>::try_from(args) {
            | Ok([key, value, option, millis]) if option.eq_ignore_ascii_case(b"PX") => {
                Ok(ClientAction::Set { key, value, ttl_millis: extract_expiry(&millis)? })
            },
            | Ok(args) => {
                warn!(?args, "SET with unrecognized option ignored");
                Ok(ClientAction::IgnoredSet)
            },
            | Err(args) => {
                warn!(?args, "SET with unrecognized arity ignored");
                Ok(ClientAction::IgnoredSet)
            },
        },
    }
}

pub fn extract_expiry(millis: &[u8]) -> Result<i64, CommandError> {
    match std::str::from_utf8(millis).ok().and_then(|millis| millis.parse::<i64>().ok()) {
        | Some(millis) if millis >= 0 => Ok(millis),
        | _ => Err(CommandError::InvalidExpiry(text(millis))),
    }
}
