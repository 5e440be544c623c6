//! ## lwes-protocol::event
//! Decoded events: a name plus an ordered mapping of typed attributes.
//!
//! Events are only built by the [`Decoder`](crate::Decoder); consumers get
//! read accessors and never mutate a delivered event.

use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::value::AttributeValue;

/// Attribute stamped by the listener with the receipt wall-clock time (ns since epoch).
pub const RECEIPT_TIME: &str = "receiptTime";
/// Attribute stamped by the listener with the sender's IPv4 address.
pub const SENDER_IP: &str = "senderIp";
/// Attribute stamped by the listener with the sender's UDP port.
pub const SENDER_PORT: &str = "senderPort";

/// Receipt metadata captured when a datagram arrives.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub time: DateTime<Utc>,
    pub sender: SocketAddrV4,
}

impl Receipt {
    /// Stamps the current wall-clock time for a datagram from `sender`.
    pub fn now(sender: SocketAddrV4) -> Self {
        Self {
            time: Utc::now(),
            sender,
        }
    }

    /// Receipt time as nanoseconds since the epoch, saturating outside
    /// the range an `i64` can hold (years 1677 to 2262).
    pub fn nanos(&self) -> i64 {
        self.time.timestamp_nanos_opt().unwrap_or(if self.time.timestamp() < 0 {
            i64::MIN
        } else {
            i64::MAX
        })
    }
}

/// A decoded event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    name: String,
    attributes: Vec<(String, AttributeValue)>,
    index: HashMap<String, usize>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_receipt(receipt: &Receipt) -> Self {
        let mut event = Self::new();
        event.insert(
            RECEIPT_TIME.to_string(),
            AttributeValue::Int64(receipt.nanos()),
        );
        event.insert(
            SENDER_IP.to_string(),
            AttributeValue::IpAddr(*receipt.sender.ip()),
        );
        event.insert(
            SENDER_PORT.to_string(),
            AttributeValue::UInt16(receipt.sender.port()),
        );
        event
    }

    /// The event's name (its class). May be empty.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.index.get(key).map(|&i| &self.attributes[i].1)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterates attributes in the order they were first inserted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Receipt time stamped by the listener, if present and well-typed.
    pub fn receipt_time(&self) -> Option<DateTime<Utc>> {
        match self.get(RECEIPT_TIME)? {
            AttributeValue::Int64(ns) => Some(DateTime::from_timestamp_nanos(*ns)),
            _ => None,
        }
    }

    pub fn sender_ip(&self) -> Option<Ipv4Addr> {
        self.get(SENDER_IP)?.as_ipv4()
    }

    pub fn sender_port(&self) -> Option<u16> {
        match self.get(SENDER_PORT)? {
            AttributeValue::UInt16(port) => Some(*port),
            _ => None,
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Inserts or overwrites in place; an overwritten key keeps its position.
    pub(crate) fn insert(&mut self, key: String, value: AttributeValue) -> Option<AttributeValue> {
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.attributes[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.attributes.len());
                self.attributes.push((key, value));
                None
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.name)?;
        for (i, (key, value)) in self.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{key} = {value}")?;
        }
        if self.is_empty() {
            f.write_str("}")
        } else {
            f.write_str(" }")
        }
    }
}

struct OrderedAttributes<'a>(&'a [(String, AttributeValue)]);

impl Serialize for OrderedAttributes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Event", 2)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("attributes", &OrderedAttributes(&self.attributes))?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_overwrites_in_place() {
        let mut event = Event::new();
        event.insert("a".into(), AttributeValue::UInt16(1));
        event.insert("b".into(), AttributeValue::UInt16(2));
        let old = event.insert("a".into(), AttributeValue::Boolean(true));

        assert_eq!(old, Some(AttributeValue::UInt16(1)));
        assert_eq!(event.len(), 2);
        let keys: Vec<_> = event.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(event.get("a"), Some(&AttributeValue::Boolean(true)));
    }

    #[test]
    fn test_receipt_metadata_accessors() {
        let sender = SocketAddrV4::new(Ipv4Addr::new(203, 0, 113, 5), 4000);
        let time = DateTime::from_timestamp_nanos(1_700_000_000_123_456_789);
        let event = Event::with_receipt(&Receipt { time, sender });

        assert_eq!(event.sender_ip(), Some(Ipv4Addr::new(203, 0, 113, 5)));
        assert_eq!(event.sender_port(), Some(4000));
        assert_eq!(event.receipt_time(), Some(time));
        assert_eq!(event.name(), "");
        assert_eq!(
            event.get(RECEIPT_TIME),
            Some(&AttributeValue::Int64(1_700_000_000_123_456_789))
        );
    }

    #[test]
    fn test_receipt_time_keeps_sub_millisecond_precision() {
        let sender = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 1);
        let earlier = DateTime::from_timestamp_nanos(1_700_000_000_123_000_001);
        let later = DateTime::from_timestamp_nanos(1_700_000_000_123_999_999);

        let a = Event::with_receipt(&Receipt { time: earlier, sender });
        let b = Event::with_receipt(&Receipt { time: later, sender });
        assert!(a.receipt_time().unwrap() < b.receipt_time().unwrap());
        assert_eq!(b.receipt_time(), Some(later));
    }

    #[test]
    fn test_receipt_nanos_saturates() {
        let sender = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 1);
        let far = DateTime::from_timestamp(20_000_000_000, 0).unwrap();
        assert_eq!(Receipt { time: far, sender }.nanos(), i64::MAX);
        let past = DateTime::from_timestamp(-20_000_000_000, 0).unwrap();
        assert_eq!(Receipt { time: past, sender }.nanos(), i64::MIN);
    }

    #[test]
    fn test_display() {
        let mut event = Event::new();
        event.set_name("Click".into());
        assert_eq!(event.to_string(), "Click {}");

        event.insert("x".into(), AttributeValue::Int32(-3));
        event.insert("url".into(), AttributeValue::String("/home".into()));
        assert_eq!(event.to_string(), "Click { x = -3, url = \"/home\" }");
    }

    #[test]
    fn test_json_preserves_order() {
        let mut event = Event::new();
        event.set_name("Click".into());
        event.insert("z".into(), AttributeValue::Boolean(false));
        event.insert("a".into(), AttributeValue::UInt32(9));

        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Click","attributes":{"z":false,"a":9}}"#
        );
    }
}
