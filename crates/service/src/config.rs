//! Configuration loading and validation for the service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Which key-wrap provider backs the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyProvider {
    /// AES-256-GCM-SIV with DEKs loaded from [`Config::dek_file`].
    Local,
    /// AWS KMS `Encrypt` / `Decrypt`.
    Kms,
}

impl KeyProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyProvider::Local => "local",
            KeyProvider::Kms => "kms",
        }
    }
}

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP(S) server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// PEM certificate chain. TLS is enabled when this and `tls_key_path` are set.
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// PEM private key matching `tls_cert_path`.
    #[serde(default)]
    pub tls_key_path: Option<String>,

    /// Key-wrap provider.
    #[serde(default = "default_key_provider")]
    pub key_provider: KeyProvider,

    /// YAML or JSON map of key id to base64 DEK. **Required** for the local provider.
    #[serde(default)]
    pub dek_file: Option<String>,

    /// OTLP endpoint. Spans are only exported when set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8443
}
fn default_key_provider() -> KeyProvider {
    KeyProvider::Local
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Whether both TLS paths are configured.
    pub fn tls_enabled(&self) -> bool {
        self.tls_cert_path.is_some() && self.tls_key_path.is_some()
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => {
                ensure_non_empty(cert, "TLS_CERT_PATH")?;
                ensure_non_empty(key, "TLS_KEY_PATH")?;
            }
            (None, None) => {}
            _ => anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together"),
        }
        if self.key_provider == KeyProvider::Local {
            let path = self
                .dek_file
                .as_deref()
                .context("DEK_FILE is required when KEY_PROVIDER=local")?;
            ensure_non_empty(path, "DEK_FILE")?;
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            listen_port: default_listen_port(),
            tls_cert_path: None,
            tls_key_path: None,
            key_provider: default_key_provider(),
            dek_file: Some("/etc/field-enc/deks.yaml".into()),
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 8443);
        assert_eq!(default_key_provider(), KeyProvider::Local);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn minimal_local_config_is_valid() {
        let cfg = base();
        assert!(cfg.validate().is_ok());
        assert!(!cfg.tls_enabled());
    }

    #[test]
    fn validate_rejects_local_without_dek_file() {
        let cfg = Config {
            dek_file: None,
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn kms_does_not_need_dek_file() {
        let cfg = Config {
            key_provider: KeyProvider::Kms,
            dek_file: None,
            ..base()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_half_tls() {
        let cfg = Config {
            tls_cert_path: Some("/run/tls.crt".into()),
            ..base()
        };
        assert!(cfg.validate().is_err());

        let cfg = Config {
            tls_cert_path: Some("/run/tls.crt".into()),
            tls_key_path: Some("/run/tls.key".into()),
            ..base()
        };
        assert!(cfg.validate().is_ok());
        assert!(cfg.tls_enabled());
    }

    #[test]
    fn validate_rejects_blank_otlp_endpoint() {
        let cfg = Config {
            otel_exporter_otlp_endpoint: Some(" ".into()),
            ..base()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn provider_names() {
        assert_eq!(KeyProvider::Local.as_str(), "local");
        assert_eq!(KeyProvider::Kms.as_str(), "kms");
    }
}
