// lwes-config/src/listener.rs
//! Listener endpoint configuration.
//!
//! The address may be a unicast interface address or a multicast group; the
//! interface is only consulted when joining a group.

use lwes_protocol::DecodeMode;
use serde::{Deserialize, Serialize};
use validator::{self, Validate, ValidationError};

use crate::validation;

/// Listener configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct ListenerConfig {
    /// Unicast address or multicast group to listen on.
    #[validate(custom(function = validation::validate_ipv4))]
    #[serde(default = "default_address")]
    pub address: String,

    /// UDP port (0 picks an ephemeral port).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Local interface address used for multicast group membership.
    #[validate(custom(function = validate_interface))]
    #[serde(default)]
    pub interface: Option<String>,

    /// Handling of malformed datagrams (lenient or strict).
    #[serde(default)]
    pub decode_mode: DecodeMode,
}

fn default_address() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    9191
}

fn validate_interface(interface: &str) -> Result<(), ValidationError> {
    validation::validate_ipv4(interface)
        .map_err(|_| ValidationError::new("invalid_interface_address"))
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            interface: None,
            decode_mode: DecodeMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_is_validated_when_present() {
        let mut config = ListenerConfig {
            interface: Some("eth0".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.interface = Some("192.168.1.10".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_address_must_be_ipv4() {
        let config = ListenerConfig {
            address: "fe80::1".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
