//! # LWES Configuration
//!
//! Layered configuration for the listener and its telemetry.
//!
//! Hierarchy, lowest priority first:
//! 1. Default values
//! 2. `config/lwes.yaml` (or an explicit file)
//! 3. `LWES_*` environment variables, `__` separating nested keys
//!    (e.g. `LWES_LISTENER__PORT=9292`)

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod listener;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use listener::ListenerConfig;
pub use telemetry::TelemetryConfig;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/lwes.yaml";

const ENV_PREFIX: &str = "LWES_";

/// Top‑level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct LwesConfig {
    /// Endpoint and decoding policy.
    #[serde(default)]
    #[validate(nested)]
    pub listener: ListenerConfig,

    /// Logging configuration.
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl LwesConfig {
    /// Load configuration from the default file (if present) and environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Self::defaults();
        if Path::new(DEFAULT_CONFIG_PATH).try_exists()? {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        }
        Self::finish(figment)
    }

    /// Load configuration from a specific file, which must exist.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.try_exists()? {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Self::finish(Self::defaults().merge(Yaml::file(path)))
    }

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(LwesConfig::default()))
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use lwes_protocol::DecodeMode;

    #[test]
    fn default_config_validates() {
        let config = LwesConfig::default();
        config.validate().expect("Default config should validate");
        assert_eq!(config.listener.address, "0.0.0.0");
        assert_eq!(config.listener.port, 9191);
        assert_eq!(config.listener.decode_mode, DecodeMode::Lenient);
    }

    #[test]
    fn file_then_environment_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "lwes.yaml",
                r#"
listener:
  address: 224.1.1.11
  port: 9292
  interface: 10.0.0.5
  decode_mode: strict
telemetry:
  log_format: json
"#,
            )?;
            jail.set_env("LWES_LISTENER__PORT", "9393");

            let config = LwesConfig::load_from_path("lwes.yaml").unwrap();
            assert_eq!(config.listener.address, "224.1.1.11");
            assert_eq!(config.listener.port, 9393);
            assert_eq!(config.listener.interface.as_deref(), Some("10.0.0.5"));
            assert_eq!(config.listener.decode_mode, DecodeMode::Strict);
            assert_eq!(config.telemetry.log_format, "json");
            assert_eq!(config.telemetry.log_level, "info");
            Ok(())
        });
    }

    #[test]
    fn default_file_is_optional() {
        Jail::expect_with(|_jail| {
            let config = LwesConfig::load().unwrap();
            assert_eq!(config, LwesConfig::default());
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.yaml", "listener:\n  address: not-an-ip\n")?;
            let err = LwesConfig::load_from_path("bad.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            assert!(err.to_string().contains("address"));
            Ok(())
        });
    }

    #[test]
    fn missing_file() {
        let err = LwesConfig::load_from_path("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn uninspectable_path_is_io_error() {
        Jail::expect_with(|jail| {
            // A regular file used as a directory cannot be stat'ed.
            jail.create_file("lwes.yaml", "listener: {}\n")?;
            let err = LwesConfig::load_from_path("lwes.yaml/nested.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Io(_)), "{err:?}");
            assert!(err.to_string().starts_with("Configuration I/O error"));
            Ok(())
        });
    }
}
