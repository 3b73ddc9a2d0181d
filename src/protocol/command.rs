//! Command definitions
//!
//! Represents commands from clients.

use thiserror::Error;

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Set a key-value pair
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Del { key: Vec<u8> },

    /// Ping (health check)
    Ping,
}

/// A request that framed correctly but names no valid command.
/// The connection replies with the message and keeps going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("empty command")]
    Empty,
}

impl Command {
    /// Build a command from request arguments (verb first)
    pub fn from_args(mut args: Vec<Vec<u8>>) -> Result<Self, CommandError> {
        if args.is_empty() {
            return Err(CommandError::Empty);
        }

        let verb = String::from_utf8_lossy(&args[0]).into_owned();
        let arity = args.len();

        match (verb.to_ascii_uppercase().as_str(), arity) {
            ("GET", 2) => Ok(Command::Get {
                key: args.swap_remove(1),
            }),
            ("SET", 3) => {
                let value = args.swap_remove(2);
                let key = args.swap_remove(1);
                Ok(Command::Set { key, value })
            }
            ("DEL", 2) => Ok(Command::Del {
                key: args.swap_remove(1),
            }),
            ("PING", 1) => Ok(Command::Ping),
            ("GET" | "SET" | "DEL" | "PING", _) => {
                Err(CommandError::WrongArity(verb.to_ascii_lowercase()))
            }
            _ => Err(CommandError::Unknown(verb)),
        }
    }

    /// Arguments in wire order (verb first)
    pub fn to_args(&self) -> Vec<&[u8]> {
        match self {
            Command::Get { key } => vec![b"GET".as_slice(), key.as_slice()],
            Command::Set { key, value } => {
                vec![b"SET".as_slice(), key.as_slice(), value.as_slice()]
            }
            Command::Del { key } => vec![b"DEL".as_slice(), key.as_slice()],
            Command::Ping => vec![b"PING".as_slice()],
        }
    }
}
