//! A raw datagram together with its receipt metadata.

use bytes::Bytes;
use lwes_protocol::Receipt;

#[derive(Debug, Clone)]
pub struct Datagram {
    pub data: Bytes,
    pub receipt: Receipt,
}

impl Datagram {
    pub fn new(data: Bytes, receipt: Receipt) -> Self {
        Datagram { data, receipt }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
