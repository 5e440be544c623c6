//! Listener error taxonomy.

use std::io;
use std::net::SocketAddrV4;

use lwes_protocol::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListenerError {
    /// Invalid address, bad interface, or the listener is in the wrong state.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The socket could not be bound or the multicast group could not be joined.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    /// Read failure on an established socket.
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// The listener was closed, possibly while a receive was in flight.
    #[error("Listener is closed")]
    Closed,

    /// The datagram was rejected by a strict decoder.
    #[error("Malformed datagram: {0}")]
    Decode(#[from] DecodeError),
}

impl ListenerError {
    /// Configuration-class errors are permanent for this listener instance.
    pub fn is_configuration(&self) -> bool {
        matches!(self, ListenerError::Config(_) | ListenerError::Closed)
    }
}
