//! Response definitions
//!
//! Represents replies to clients.

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `+OK` (SET)
    Ok,

    /// `+PONG`
    Pong,

    /// Bulk string (GET hit)
    Bulk(Vec<u8>),

    /// Null bulk string (GET miss)
    Nil,

    /// Integer (DEL acknowledgment)
    Integer(i64),

    /// `-ERR <message>`
    Error(String),
}

impl Response {
    /// Create an ERROR response
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}
