//! Conversion of textual or structured addresses into the IPv4 address a
//! listener binds to.

use std::net::{IpAddr, Ipv4Addr};

use crate::error::ListenerError;

/// Values that can name a listener address or multicast interface.
///
/// Only IPv4 is supported; everything else is a configuration error.
pub trait IntoListenerAddr {
    fn into_listener_addr(self) -> Result<Ipv4Addr, ListenerError>;
}

impl IntoListenerAddr for Ipv4Addr {
    fn into_listener_addr(self) -> Result<Ipv4Addr, ListenerError> {
        Ok(self)
    }
}

impl IntoListenerAddr for IpAddr {
    fn into_listener_addr(self) -> Result<Ipv4Addr, ListenerError> {
        match self {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(ip) => Err(ListenerError::Config(format!(
                "{ip} is not an IPv4 address"
            ))),
        }
    }
}

impl IntoListenerAddr for &str {
    fn into_listener_addr(self) -> Result<Ipv4Addr, ListenerError> {
        self.trim()
            .parse::<IpAddr>()
            .map_err(|e| ListenerError::Config(format!("invalid address '{self}': {e}")))?
            .into_listener_addr()
    }
}

impl IntoListenerAddr for &String {
    fn into_listener_addr(self) -> Result<Ipv4Addr, ListenerError> {
        self.as_str().into_listener_addr()
    }
}

impl IntoListenerAddr for String {
    fn into_listener_addr(self) -> Result<Ipv4Addr, ListenerError> {
        self.as_str().into_listener_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_addresses() {
        assert_eq!(
            "224.1.1.11".into_listener_addr().unwrap(),
            Ipv4Addr::new(224, 1, 1, 11)
        );
        assert_eq!(
            " 127.0.0.1 ".to_string().into_listener_addr().unwrap(),
            Ipv4Addr::LOCALHOST
        );
    }

    #[test]
    fn test_rejects_ipv6_and_garbage() {
        assert!(matches!(
            "::1".into_listener_addr(),
            Err(ListenerError::Config(_))
        ));
        assert!(matches!(
            "not-an-ip".into_listener_addr(),
            Err(ListenerError::Config(_))
        ));
        assert!(matches!(
            IpAddr::from([0u16, 0, 0, 0, 0, 0, 0, 1]).into_listener_addr(),
            Err(ListenerError::Config(_))
        ));
    }
}
