//! Client configuration.
//!
//! Can be built in code or loaded from YAML:
//!
//! ```yaml
//! url: https://example.com/geoserver/wfs
//! version: 1.1.0          # optional, skips negotiation
//! keep_alive: true
//! max_connections: 8
//! user_agent: my-app/1.0
//! retry_count: 2
//! timeout_secs: 30
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use wfs_common::{ConfigError, ProtocolVersion, VersionRegistry};

/// HTTP transport tuning. Shared read-only by every request of a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    /// Reuse pooled connections between requests
    #[serde(alias = "keepAlive")]
    pub keep_alive: bool,

    /// Limit on concurrent in-flight requests and idle connections per host
    #[serde(alias = "maxConnections", alias = "maxSockets")]
    pub max_connections: Option<usize>,

    /// `User-Agent` header value
    #[serde(alias = "userAgentString", alias = "userAgent")]
    pub user_agent: Option<String>,

    /// Extra attempts after a connection failure, timeout or 5xx status
    #[serde(alias = "retryCount", alias = "retry")]
    pub retry_count: u32,

    /// Per-request timeout in seconds
    #[serde(alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            keep_alive: true,
            max_connections: None,
            user_agent: None,
            retry_count: 0,
            timeout_secs: None,
        }
    }
}

/// Configuration fixed at client construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service endpoint, e.g. `https://example.com/geoserver/wfs`
    pub url: String,

    /// Explicit protocol version. Skips negotiation when set.
    #[serde(default)]
    pub version: Option<ProtocolVersion>,

    #[serde(flatten)]
    pub transport: TransportOptions,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            version: None,
            transport: TransportOptions::default(),
        }
    }

    pub fn version(mut self, version: ProtocolVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.transport.keep_alive = keep_alive;
        self
    }

    pub fn max_connections(mut self, max: usize) -> Self {
        self.transport.max_connections = Some(max);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.transport.user_agent = Some(user_agent.into());
        self
    }

    pub fn retry_count(mut self, retries: u32) -> Self {
        self.transport.retry_count = retries;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.transport.timeout_secs = Some(secs);
        self
    }

    /// Load a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let load_error = |message: String| ConfigError::Load {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let config: ClientConfig =
            serde_yaml::from_str(&content).map_err(|e| load_error(e.to_string()))?;

        debug!(path = %path.display(), url = %config.url, "Loaded client config");
        Ok(config)
    }

    /// Check the configuration against the versions the client speaks.
    ///
    /// Only validates what can be checked without the network: URL presence
    /// and scheme, explicit version membership and option ranges.
    pub fn validate(&self, registry: &VersionRegistry) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingUrl);
        }

        let parsed = reqwest::Url::parse(&self.url).map_err(|e| ConfigError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        if let Some(version) = self.version {
            if !registry.contains(&version) {
                return Err(ConfigError::UnsupportedVersion {
                    version,
                    supported: registry.display_list(),
                });
            }
        }

        if self.transport.max_connections == Some(0) {
            return Err(ConfigError::InvalidOption {
                option: "max_connections".to_string(),
                message: "must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("http://localhost:8080/wfs");
        assert_eq!(config.version, None);
        assert!(config.transport.keep_alive);
        assert_eq!(config.transport.retry_count, 0);
        assert!(config.validate(&VersionRegistry::supported()).is_ok());
    }

    #[test]
    fn test_missing_url() {
        let err = ClientConfig::new("  ")
            .validate(&VersionRegistry::supported())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingUrl));
    }

    #[test]
    fn test_invalid_url() {
        let registry = VersionRegistry::supported();
        assert!(matches!(
            ClientConfig::new("not a url").validate(&registry),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            ClientConfig::new("ftp://example.com/wfs").validate(&registry),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_explicit_version_must_be_supported() {
        let registry = VersionRegistry::supported();
        let ok = ClientConfig::new("http://localhost/wfs").version(ProtocolVersion::V1_1_0);
        assert!(ok.validate(&registry).is_ok());

        let bad = ClientConfig::new("http://localhost/wfs").version(ProtocolVersion::new(1, 2, 0));
        match bad.validate(&registry) {
            Err(ConfigError::UnsupportedVersion { version, supported }) => {
                assert_eq!(version.to_string(), "1.2.0");
                assert_eq!(supported, "1.0.0, 1.1.0, 2.0.0");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_zero_max_connections_rejected() {
        let config = ClientConfig::new("http://localhost/wfs").max_connections(0);
        assert!(matches!(
            config.validate(&VersionRegistry::supported()),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_parse_yaml_with_camel_case_aliases() {
        let yaml = r#"
url: https://example.com/geoserver/wfs
version: 1.1.0
keepAlive: false
maxConnections: 4
userAgentString: test-agent/1.0
retryCount: 3
"#;
        let config: ClientConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.version, Some(ProtocolVersion::V1_1_0));
        assert!(!config.transport.keep_alive);
        assert_eq!(config.transport.max_connections, Some(4));
        assert_eq!(config.transport.user_agent.as_deref(), Some("test-agent/1.0"));
        assert_eq!(config.transport.retry_count, 3);
        assert_eq!(config.transport.timeout_secs, None);
    }

    #[test]
    fn test_parse_yaml_minimal() {
        let config: ClientConfig = serde_yaml::from_str("url: http://localhost/wfs").unwrap();
        assert_eq!(config, ClientConfig::new("http://localhost/wfs"));
    }

    #[test]
    fn test_parse_yaml_rejects_malformed_version() {
        let yaml = "url: http://localhost/wfs\nversion: \"1.1\"\n";
        assert!(serde_yaml::from_str::<ClientConfig>(yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "url: http://localhost:8080/wfs").unwrap();
        writeln!(file, "retry_count: 2").unwrap();

        let config = ClientConfig::load(file.path()).unwrap();
        assert_eq!(config.url, "http://localhost:8080/wfs");
        assert_eq!(config.transport.retry_count, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ClientConfig::load(Path::new("/nonexistent/wfs.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }
}
