//! ## lwes-protocol::value
//! Typed attribute values and the one-byte type tags that select them on the wire.

use std::fmt;
use std::net::Ipv4Addr;

use serde::Serialize;

/// Wire type tag preceding every attribute value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    UInt16 = 1,
    Int16 = 2,
    UInt32 = 3,
    Int32 = 4,
    String = 5,
    IpAddr = 6,
    Int64 = 7,
    UInt64 = 8,
    Boolean = 9,
}

impl TypeTag {
    /// The LWES type name, as used in event definition files.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::UInt16 => "uint16",
            TypeTag::Int16 => "int16",
            TypeTag::UInt32 => "uint32",
            TypeTag::Int32 => "int32",
            TypeTag::String => "string",
            TypeTag::IpAddr => "ip_addr",
            TypeTag::Int64 => "int64",
            TypeTag::UInt64 => "uint64",
            TypeTag::Boolean => "boolean",
        }
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            1 => TypeTag::UInt16,
            2 => TypeTag::Int16,
            3 => TypeTag::UInt32,
            4 => TypeTag::Int32,
            5 => TypeTag::String,
            6 => TypeTag::IpAddr,
            7 => TypeTag::Int64,
            8 => TypeTag::UInt64,
            9 => TypeTag::Boolean,
            other => return Err(other),
        })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single decoded attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    UInt16(u16),
    Int16(i16),
    UInt32(u32),
    Int32(i32),
    String(String),
    IpAddr(Ipv4Addr),
    Int64(i64),
    UInt64(u64),
    Boolean(bool),
}

impl AttributeValue {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            AttributeValue::UInt16(_) => TypeTag::UInt16,
            AttributeValue::Int16(_) => TypeTag::Int16,
            AttributeValue::UInt32(_) => TypeTag::UInt32,
            AttributeValue::Int32(_) => TypeTag::Int32,
            AttributeValue::String(_) => TypeTag::String,
            AttributeValue::IpAddr(_) => TypeTag::IpAddr,
            AttributeValue::Int64(_) => TypeTag::Int64,
            AttributeValue::UInt64(_) => TypeTag::UInt64,
            AttributeValue::Boolean(_) => TypeTag::Boolean,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Widens any unsigned integer kind to `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            AttributeValue::UInt16(v) => Some(v.into()),
            AttributeValue::UInt32(v) => Some(v.into()),
            AttributeValue::UInt64(v) => Some(v),
            _ => None,
        }
    }

    /// Widens any signed integer kind to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            AttributeValue::Int16(v) => Some(v.into()),
            AttributeValue::Int32(v) => Some(v.into()),
            AttributeValue::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            AttributeValue::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match *self {
            AttributeValue::IpAddr(ip) => Some(ip),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::UInt16(v) => write!(f, "{v}"),
            AttributeValue::Int16(v) => write!(f, "{v}"),
            AttributeValue::UInt32(v) => write!(f, "{v}"),
            AttributeValue::Int32(v) => write!(f, "{v}"),
            AttributeValue::String(s) => write!(f, "{s:?}"),
            AttributeValue::IpAddr(ip) => write!(f, "{ip}"),
            AttributeValue::Int64(v) => write!(f, "{v}"),
            AttributeValue::UInt64(v) => write!(f, "{v}"),
            AttributeValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}
