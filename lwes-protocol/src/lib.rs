//! # LWES Protocol
//!
//! Decoding of Light Weight Event System datagrams into named events
//! carrying typed attributes.

pub mod decoder;
pub mod event;
pub mod value;

pub use decoder::{decode, decode_with, DecodeError, DecodeMode, Decoder};
pub use event::{Event, Receipt, RECEIPT_TIME, SENDER_IP, SENDER_PORT};
pub use value::{AttributeValue, TypeTag};
