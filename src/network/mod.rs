//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread (non-blocking accept, polls the shutdown flag)
//! - One thread per connection, capped by `max_connections`
//! - Commands routed through the [`KvStore`](crate::store::KvStore) facade

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle};
