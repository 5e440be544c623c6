//! ## lwes-protocol::decoder
//! Decodes one LWES datagram into an [`Event`].
//!
//! Layout (big-endian, no padding):
//!
//! ```text
//! u8  name_len | name | u16 attr_count
//! attr_count x ( u8 key_len | key | u8 type_tag | value )
//! ```
//!
//! Decoding never touches the input and only allocates the returned event.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use bytes::Buf;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::event::{Event, Receipt};
use crate::value::{AttributeValue, TypeTag};

/// Errors raised by the decoder in [`DecodeMode::Strict`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A declared length runs past the end of the buffer.
    #[error("Truncated {field}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    /// The type tag is outside the dispatch table.
    #[error("Unknown type tag {tag} for attribute '{attribute}'")]
    UnknownTypeTag { tag: u8, attribute: String },
    /// Bytes left over after the declared attribute count was decoded.
    #[error("{0} trailing bytes after last attribute")]
    TrailingBytes(usize),
    /// A name or string value is not valid UTF-8.
    #[error("Invalid UTF-8 sequence in {field}")]
    InvalidUtf8 { field: &'static str },
}

/// How the decoder treats malformed datagrams.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    /// Stop at the first inconsistency and keep what was decoded so far.
    #[default]
    Lenient,
    /// Reject the datagram on any inconsistency.
    Strict,
}

impl FromStr for DecodeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lenient" => Ok(DecodeMode::Lenient),
            "strict" => Ok(DecodeMode::Strict),
            other => Err(format!("unknown decode mode '{other}'")),
        }
    }
}

impl fmt::Display for DecodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeMode::Lenient => f.write_str("lenient"),
            DecodeMode::Strict => f.write_str("strict"),
        }
    }
}

/// Decodes a datagram with the lenient, reference-compatible policy.
pub fn decode(data: &[u8]) -> Result<Event, DecodeError> {
    Decoder::new().decode(data)
}

/// Decodes a datagram with the given policy.
pub fn decode_with(data: &[u8], mode: DecodeMode) -> Result<Event, DecodeError> {
    Decoder::with_mode(mode).decode(data)
}

/// LWES event decoder.
#[derive(Default, Debug, Copy, Clone)]
pub struct Decoder {
    mode: DecodeMode,
}

impl Decoder {
    /// Creates a lenient decoder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self::with_mode(DecodeMode::Strict)
    }

    pub fn with_mode(mode: DecodeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Decodes a datagram into a fresh event with no metadata.
    pub fn decode(&self, data: &[u8]) -> Result<Event, DecodeError> {
        let mut event = Event::new();
        self.decode_into(data, &mut event)?;
        Ok(event)
    }

    /// Decodes a received datagram; the receipt metadata is inserted first so
    /// wire attributes of the same name overwrite it.
    pub fn decode_received(&self, data: &[u8], receipt: &Receipt) -> Result<Event, DecodeError> {
        let mut event = Event::with_receipt(receipt);
        self.decode_into(data, &mut event)?;
        Ok(event)
    }

    fn decode_into(&self, data: &[u8], event: &mut Event) -> Result<(), DecodeError> {
        let mut reader = Reader { buf: data };
        match self.read_event(&mut reader, event) {
            Ok(()) if reader.buf.has_remaining() && self.mode == DecodeMode::Strict => {
                Err(DecodeError::TrailingBytes(reader.buf.remaining()))
            }
            Ok(()) => Ok(()),
            Err(err) if self.mode == DecodeMode::Lenient => {
                debug!(
                    event = event.name(),
                    attributes = event.len(),
                    "Stopped decoding early: {err}"
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn read_event(&self, reader: &mut Reader<'_>, event: &mut Event) -> Result<(), DecodeError> {
        let name_len = reader.u8("event name length")?;
        let name = reader.take(name_len.into(), "event name")?;
        event.set_name(self.text(name, "event name")?);

        let count = reader.u16("attribute count")?;
        trace!(event = event.name(), count, "Decoding attributes");

        for _ in 0..count {
            let key_len = reader.u8("attribute name length")?;
            let key = reader.take(key_len.into(), "attribute name")?;
            let key = self.text(key, "attribute name")?;

            let tag = reader.u8("type tag")?;
            let tag = TypeTag::try_from(tag)
                .map_err(|tag| DecodeError::UnknownTypeTag {
                    tag,
                    attribute: key.clone(),
                })?;

            let value = self.read_value(reader, tag)?;
            event.insert(key, value);
        }
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, tag: TypeTag) -> Result<AttributeValue, DecodeError> {
        let field = tag.name();
        Ok(match tag {
            TypeTag::UInt16 => AttributeValue::UInt16(reader.fixed(2, field, |b| b.get_u16())?),
            TypeTag::Int16 => AttributeValue::Int16(reader.fixed(2, field, |b| b.get_i16())?),
            TypeTag::UInt32 => AttributeValue::UInt32(reader.fixed(4, field, |b| b.get_u32())?),
            TypeTag::Int32 => AttributeValue::Int32(reader.fixed(4, field, |b| b.get_i32())?),
            TypeTag::Int64 => AttributeValue::Int64(reader.fixed(8, field, |b| b.get_i64())?),
            TypeTag::UInt64 => AttributeValue::UInt64(reader.fixed(8, field, |b| b.get_u64())?),
            // Octets arrive in reverse order relative to dotted notation.
            TypeTag::IpAddr => {
                let [b0, b1, b2, b3] = reader.fixed(4, field, |b| b.get_u32())?.to_be_bytes();
                AttributeValue::IpAddr(Ipv4Addr::new(b3, b2, b1, b0))
            }
            // Only exactly 1 is true.
            TypeTag::Boolean => AttributeValue::Boolean(reader.u8(field)? == 1),
            TypeTag::String => {
                let len = reader.u16("string length")?;
                let raw = reader.take(len.into(), "string value")?;
                AttributeValue::String(self.text(raw, "string value")?)
            }
        })
    }

    fn text(&self, raw: &[u8], field: &'static str) -> Result<String, DecodeError> {
        match self.mode {
            DecodeMode::Strict => std::str::from_utf8(raw)
                .map(str::to_owned)
                .map_err(|_| DecodeError::InvalidUtf8 { field }),
            DecodeMode::Lenient => Ok(String::from_utf8_lossy(raw).into_owned()),
        }
    }
}

/// Bounds-checked cursor over the datagram.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn need(&self, needed: usize, field: &'static str) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::Truncated {
                field,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn fixed<T>(
        &mut self,
        width: usize,
        field: &'static str,
        get: impl FnOnce(&mut &'a [u8]) -> T,
    ) -> Result<T, DecodeError> {
        self.need(width, field)?;
        Ok(get(&mut self.buf))
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        self.need(1, field)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.need(2, field)?;
        Ok(self.buf.get_u16())
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        self.need(len, field)?;
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }
}
