//! Typed Requests
//!
//! Turns a decoded [`Command`] into a validated [`Request`]. Arguments are
//! consumed positionally and the command name is matched case-insensitively.

use crate::protocol::Command;
use std::time::Duration;
use thiserror::Error;

/// A validated command, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `PING [message]`
    Ping(Option<String>),
    /// `ECHO message`
    Echo(String),
    /// `GET key`
    Get(String),
    /// `SET key value [PX milliseconds]`
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
    },
}

/// Reasons a command cannot be turned into a [`Request`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("invalid expire time '{0}'")]
    InvalidExpire(String),

    #[error("syntax error near '{0}'")]
    Syntax(String),
}

impl Request {
    /// Validates a decoded command.
    pub fn parse(command: Command) -> Result<Self, CommandError> {
        let mut args = command.into_parts();
        let name = args.remove(0);

        match name.to_ascii_uppercase().as_str() {
            "PING" => match args.len() {
                0 | 1 => Ok(Request::Ping(args.pop())),
                _ => Err(CommandError::WrongArity("ping")),
            },
            "ECHO" => {
                let [message] = exact::<1>(args, "echo")?;
                Ok(Request::Echo(message))
            }
            "GET" => {
                let [key] = exact::<1>(args, "get")?;
                Ok(Request::Get(key))
            }
            "SET" => parse_set(args),
            _ => Err(CommandError::Unknown(name)),
        }
    }

    /// Upper-case command name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Request::Ping(_) => "PING",
            Request::Echo(_) => "ECHO",
            Request::Get(_) => "GET",
            Request::Set { .. } => "SET",
        }
    }

    /// Whether running this request touches the store.
    pub fn touches_store(&self) -> bool {
        matches!(self, Request::Get(_) | Request::Set { .. })
    }
}

fn exact<const N: usize>(args: Vec<String>, name: &'static str) -> Result<[String; N], CommandError> {
    args.try_into().map_err(|_| CommandError::WrongArity(name))
}

/// SET key value [PX milliseconds]
fn parse_set(args: Vec<String>) -> Result<Request, CommandError> {
    match args.len() {
        0 | 1 => Err(CommandError::WrongArity("set")),
        2 => {
            let [key, value] = exact::<2>(args, "set")?;
            Ok(Request::Set {
                key,
                value,
                ttl: None,
            })
        }
        4 => {
            let [key, value, option, millis] = exact::<4>(args, "set")?;
            if !option.eq_ignore_ascii_case("PX") {
                return Err(CommandError::Syntax(option));
            }
            let millis: u64 = millis
                .parse()
                .map_err(|_| CommandError::InvalidExpire(millis.clone()))?;
            Ok(Request::Set {
                key,
                value,
                ttl: Some(Duration::from_millis(millis)),
            })
        }
        _ => Err(CommandError::Syntax(args[2].clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(parts: &[&str]) -> Result<Request, CommandError> {
        Request::parse(Command::from_parts(parts.iter().copied()).unwrap())
    }

    #[test]
    fn test_parse_ping() {
        assert_eq!(parse(&["PING"]), Ok(Request::Ping(None)));
        assert_eq!(
            parse(&["ping", "hello"]),
            Ok(Request::Ping(Some("hello".to_string())))
        );
        assert_eq!(
            parse(&["PING", "a", "b"]),
            Err(CommandError::WrongArity("ping"))
        );
    }

    #[test]
    fn test_parse_echo() {
        assert_eq!(parse(&["Echo", "hi"]), Ok(Request::Echo("hi".to_string())));
        assert_eq!(parse(&["ECHO"]), Err(CommandError::WrongArity("echo")));
    }

    #[test]
    fn test_parse_get() {
        assert_eq!(parse(&["get", "k"]), Ok(Request::Get("k".to_string())));
        assert_eq!(
            parse(&["GET", "a", "b"]),
            Err(CommandError::WrongArity("get"))
        );
    }

    #[test]
    fn test_parse_set() {
        assert_eq!(
            parse(&["SET", "k", "v"]),
            Ok(Request::Set {
                key: "k".to_string(),
                value: "v".to_string(),
                ttl: None,
            })
        );
        assert_eq!(
            parse(&["set", "k", "v", "px", "1500"]),
            Ok(Request::Set {
                key: "k".to_string(),
                value: "v".to_string(),
                ttl: Some(Duration::from_millis(1500)),
            })
        );
    }

    #[test]
    fn test_parse_set_errors() {
        assert_eq!(parse(&["SET", "k"]), Err(CommandError::WrongArity("set")));
        assert_eq!(
            parse(&["SET", "k", "v", "PX"]),
            Err(CommandError::Syntax("PX".to_string()))
        );
        assert_eq!(
            parse(&["SET", "k", "v", "EX", "10"]),
            Err(CommandError::Syntax("EX".to_string()))
        );
        assert_eq!(
            parse(&["SET", "k", "v", "PX", "-5"]),
            Err(CommandError::InvalidExpire("-5".to_string()))
        );
        assert_eq!(
            parse(&["SET", "k", "v", "PX", "soon"]),
            Err(CommandError::InvalidExpire("soon".to_string()))
        );
    }

    #[test]
    fn test_unknown_command_keeps_original_name() {
        assert_eq!(
            parse(&["FlushAll"]),
            Err(CommandError::Unknown("FlushAll".to_string()))
        );
    }

    #[test]
    fn test_touches_store() {
        assert!(!parse(&["PING"]).unwrap().touches_store());
        assert!(parse(&["GET", "k"]).unwrap().touches_store());
    }
}
