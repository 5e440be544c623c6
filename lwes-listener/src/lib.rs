//! lwes-listener
//!
//! Owns a UDP socket (unicast or multicast group) and turns each received
//! datagram into a decoded [`Event`](lwes_protocol::Event) stamped with
//! receipt metadata.

pub mod addr;
pub mod datagram;
pub mod error;
pub mod listener;

pub use addr::IntoListenerAddr;
pub use datagram::Datagram;
pub use error::ListenerError;
pub use listener::{Closer, Listener, MAX_MSG_SIZE};
