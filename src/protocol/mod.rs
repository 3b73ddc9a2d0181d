//! Protocol Module
//!
//! RESP-like text protocol spoken by the TCP server.
//!
//! ## Request Format
//! Either a RESP array of bulk strings:
//! ```text
//! *3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n
//! ```
//! or an inline line split on whitespace:
//! ```text
//! SET a 1\r\n
//! ```
//!
//! ### Commands (case-insensitive)
//! - GET key
//! - SET key value
//! - DEL key
//! - PING
//!
//! ## Replies
//! | Reply          | Wire form              |
//! |----------------|------------------------|
//! | value found    | `$<len>\r\n<value>\r\n`|
//! | not found      | `$-1\r\n`              |
//! | SET ok         | `+OK\r\n`              |
//! | DEL ack        | `:1\r\n`               |
//! | PING           | `+PONG\r\n`            |
//! | error          | `-ERR <message>\r\n`   |

mod codec;
mod command;
mod response;

pub use codec::{
    encode_request, encode_response, read_request, read_response, write_response,
    MAX_ARGS, MAX_BULK_SIZE,
};
pub use command::{Command, CommandError};
pub use response::Response;
