// lwes-config/src/validation.rs
//! Custom validation functions for configuration.

use std::net::Ipv4Addr;

use validator::ValidationError;

/// Validate that an address is a dotted-quad IPv4 address.
pub fn validate_ipv4(addr: &str) -> Result<(), ValidationError> {
    addr.trim()
        .parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("invalid_ipv4_address"))
}

/// Validate log level names understood by `tracing`.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Validate log output format.
pub fn validate_log_format(format: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^(pretty|json)$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(format) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4() {
        assert!(validate_ipv4("224.1.1.11").is_ok());
        assert!(validate_ipv4("0.0.0.0").is_ok());
        assert!(validate_ipv4("::1").is_err());
        assert!(validate_ipv4("localhost").is_err());
    }

    #[test]
    fn test_log_settings() {
        assert!(validate_log_level("DEBUG").is_ok());
        assert!(validate_log_level("verbose").is_err());
        assert!(validate_log_format("json").is_ok());
        assert!(validate_log_format("xml").is_err());
    }
}
