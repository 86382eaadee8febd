use log::info;
use std::env;
use tokio::time::Duration;
use url::Url;

use crate::error::NodeError;
use crate::telemetry::{PublishTarget, RetryPolicy};

const DEFAULT_DEVICE_ID: &str = "testArduino";
const DEFAULT_DATABASE_ID: &str = "ColorsDB";
const DEFAULT_COLLECTION_ID: &str = "ColorReadings";
const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PUBLISH_ATTEMPTS: u64 = 3;

/// Where classified readings are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Unauthenticated POST to an ingestion function
    Function,
    /// Signed POST straight to the document-store REST API
    DocumentStore,
}

#[derive(Clone)]
pub struct NodeConfig {
    pub cosmos_host: String,
    pub master_key_b64: String,
    pub function_url: Option<Url>,
    pub publish_mode: PublishMode,
    pub device_id: String,
    pub database_id: String,
    pub collection_id: String,
    pub i2c_bus: String,
    pub sample_interval: Duration,
    pub http_timeout: Duration,
    pub publish_attempts: usize,
}

impl NodeConfig {
    pub fn new() -> Result<Self, NodeError> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, NodeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| NodeError::Config(format!("{} environment variable not set", key)))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let number = |key: &str, default: u64| -> Result<u64, NodeError> {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| NodeError::Config(format!("{} must be a number, got '{}'", key, raw))),
                None => Ok(default),
            }
        };

        let cosmos_host = required("COSMOS_HOST")?;
        let master_key_b64 = required("MASTER_KEY_B64")?;

        let publish_mode = match optional("PUBLISH_MODE", "function").to_lowercase().as_str() {
            "function" => PublishMode::Function,
            "document" | "documentstore" => PublishMode::DocumentStore,
            other => {
                return Err(NodeError::Config(format!(
                    "PUBLISH_MODE must be 'function' or 'document', got '{}'",
                    other
                )))
            }
        };

        let function_url = match lookup("FUNCTION_URL").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(
                Url::parse(raw.trim())
                    .map_err(|e| NodeError::Config(format!("FUNCTION_URL is invalid: {}", e)))?,
            ),
            None => None,
        };
        if publish_mode == PublishMode::Function && function_url.is_none() {
            return Err(NodeError::Config(
                "FUNCTION_URL environment variable not set".into(),
            ));
        }

        let sample_interval_ms = number("SAMPLE_INTERVAL_MS", DEFAULT_SAMPLE_INTERVAL_MS)?;
        let http_timeout_secs = number("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        if http_timeout_secs == 0 {
            return Err(NodeError::Config(
                "HTTP_TIMEOUT_SECS must be greater than zero".into(),
            ));
        }

        let publish_attempts = number("PUBLISH_ATTEMPTS", DEFAULT_PUBLISH_ATTEMPTS)?;
        if publish_attempts == 0 {
            return Err(NodeError::Config(
                "PUBLISH_ATTEMPTS must be at least 1".into(),
            ));
        }

        Ok(NodeConfig {
            cosmos_host,
            master_key_b64,
            function_url,
            publish_mode,
            device_id: optional("DEVICE_ID", DEFAULT_DEVICE_ID),
            database_id: optional("DATABASE_ID", DEFAULT_DATABASE_ID),
            collection_id: optional("COLLECTION_ID", DEFAULT_COLLECTION_ID),
            i2c_bus: optional("I2C_BUS", DEFAULT_I2C_BUS),
            sample_interval: Duration::from_millis(sample_interval_ms),
            http_timeout: Duration::from_secs(http_timeout_secs),
            publish_attempts: publish_attempts as usize,
        })
    }

    /// Resource link covered by document-store signatures
    pub fn resource_link(&self) -> String {
        format!("dbs/{}/colls/{}", self.database_id, self.collection_id)
    }

    /// Document collection endpoint on the configured host
    pub fn document_url(&self) -> Result<Url, NodeError> {
        let raw = format!("https://{}/{}/docs", self.cosmos_host, self.resource_link());
        Url::parse(&raw).map_err(|e| NodeError::Config(format!("Invalid document URL {}: {}", raw, e)))
    }

    pub fn publish_target(&self) -> Result<PublishTarget, NodeError> {
        match self.publish_mode {
            PublishMode::Function => {
                let url = self
                    .function_url
                    .clone()
                    .ok_or_else(|| NodeError::Config("FUNCTION_URL environment variable not set".into()))?;
                Ok(PublishTarget::Function { url })
            }
            PublishMode::DocumentStore => Ok(PublishTarget::DocumentStore {
                url: self.document_url()?,
                resource_link: self.resource_link(),
            }),
        }
    }

    /// Attempt limit for each publish; backoff keeps its default
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.publish_attempts,
            ..RetryPolicy::default()
        }
    }

    /// Log the resolved settings, leaving out the signing key
    pub fn log_summary(&self) {
        info!("Device ID: {}", self.device_id);
        info!("Publish mode: {:?}", self.publish_mode);
        info!("Document store: {} ({})", self.cosmos_host, self.resource_link());
        if let Some(url) = &self.function_url {
            info!("Function URL: {}", url);
        }
        info!("I2C bus: {}", self.i2c_bus);
        info!(
            "Sample interval: {} ms, HTTP timeout: {} s, publish attempts: {}",
            self.sample_interval.as_millis(),
            self.http_timeout.as_secs(),
            self.publish_attempts
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<NodeConfig, NodeError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NodeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const BASE: [(&str, &str); 3] = [
        ("COSMOS_HOST", "colors.documents.azure.com"),
        ("MASTER_KEY_B64", "Y29sb3Itbm9kZS1zaGFyZWQtc2VjcmV0"),
        ("FUNCTION_URL", "https://colors.azurewebsites.net/api/InsertColorData"),
    ];

    #[test]
    fn defaults_apply_when_optional_values_missing() {
        let config = load(&BASE).unwrap();
        assert_eq!(config.publish_mode, PublishMode::Function);
        assert_eq!(config.device_id, "testArduino");
        assert_eq!(config.i2c_bus, "/dev/i2c-1");
        assert_eq!(config.sample_interval, Duration::from_millis(100));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.retry_policy().max_attempts, 3);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let err = load(&BASE[..1]).err().unwrap();
        assert!(matches!(err, NodeError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn function_mode_requires_function_url() {
        assert!(load(&BASE[..2]).is_err());

        let mut pairs = BASE[..2].to_vec();
        pairs.push(("PUBLISH_MODE", "document"));
        let config = load(&pairs).unwrap();
        assert_eq!(config.publish_mode, PublishMode::DocumentStore);
    }

    #[test]
    fn document_target_uses_host_and_collection() {
        let mut pairs = BASE.to_vec();
        pairs.push(("PUBLISH_MODE", "document"));
        let config = load(&pairs).unwrap();

        match config.publish_target().unwrap() {
            PublishTarget::DocumentStore { url, resource_link } => {
                assert_eq!(
                    url.as_str(),
                    "https://colors.documents.azure.com/dbs/ColorsDB/colls/ColorReadings/docs"
                );
                assert_eq!(resource_link, "dbs/ColorsDB/colls/ColorReadings");
            }
            PublishTarget::Function { .. } => panic!("expected document-store target"),
        }
    }

    #[test]
    fn rejects_bad_values() {
        let mut pairs = BASE.to_vec();
        pairs.push(("SAMPLE_INTERVAL_MS", "fast"));
        assert!(load(&pairs).is_err());

        let mut pairs = BASE.to_vec();
        pairs.push(("PUBLISH_MODE", "mqtt"));
        assert!(load(&pairs).is_err());

        let mut pairs = BASE.to_vec();
        pairs.push(("PUBLISH_ATTEMPTS", "0"));
        assert!(load(&pairs).is_err());

        let mut pairs = BASE.to_vec();
        pairs[2] = ("FUNCTION_URL", "not a url");
        assert!(load(&pairs).is_err());
    }
}
