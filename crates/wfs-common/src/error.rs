//! Error types for the WFS client.

use thiserror::Error;

use crate::version::{DeclaredVersion, ProtocolVersion, VersionParseError};

/// Result type alias using WfsError.
pub type WfsResult<T> = Result<T, WfsError>;

/// Primary error type for WFS client operations.
#[derive(Debug, Error)]
pub enum WfsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

impl WfsError {
    /// Short category name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            WfsError::Config(_) => "config",
            WfsError::Transport(_) => "transport",
            WfsError::Negotiation(_) => "negotiation",
        }
    }
}

/// Invalid client configuration. Raised before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Service URL is required")]
    MissingUrl,

    #[error("Invalid service URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Version {version} not supported by client (supported: {supported})")]
    UnsupportedVersion {
        version: ProtocolVersion,
        supported: String,
    },

    #[error(transparent)]
    InvalidVersion(#[from] VersionParseError),

    #[error("Invalid transport option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    #[error("Failed to load client config from {path}: {message}")]
    Load { path: String, message: String },
}

/// Failure to obtain a parsed capabilities document.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Service at {url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Empty body in response from {url}")]
    EmptyBody { url: String },

    #[error("Capabilities response is not valid XML: {0}")]
    InvalidXml(String),

    #[error("Service exception ({code}): {message}")]
    ServiceException { code: String, message: String },
}

impl TransportError {
    /// Whether another attempt at the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Request { .. } | TransportError::Timeout { .. } => true,
            TransportError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Client and server could not agree on a protocol version.
#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("Unable to read version in capabilities requested with version {candidate} (found {found:?})")]
    VersionUnreadable {
        candidate: ProtocolVersion,
        found: Option<String>,
    },

    #[error("Version negotiation has failed. Lowest version supported by server is {server} but candidate version was {candidate}")]
    BelowServerFloor {
        candidate: ProtocolVersion,
        server: DeclaredVersion,
    },

    #[error("No compatible version: server answered {server} to candidate {candidate} and client has no older version")]
    NoCompatibleVersion {
        candidate: ProtocolVersion,
        server: DeclaredVersion,
    },

    #[error("Client version registry is empty")]
    EmptyRegistry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_versions() {
        let err = NegotiationError::BelowServerFloor {
            candidate: ProtocolVersion::V1_0_0,
            server: ProtocolVersion::V1_1_0.into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1.1.0"));
        assert!(msg.contains("1.0.0"));

        let err = NegotiationError::NoCompatibleVersion {
            candidate: ProtocolVersion::V1_1_0,
            server: "0.9.0-beta".parse().unwrap(),
        };
        assert!(err.to_string().contains("0.9.0-beta"));
    }

    #[test]
    fn test_wfs_error_conversion() {
        let err: WfsError = ConfigError::MissingUrl.into();
        assert_eq!(err.kind(), "config");
        assert_eq!(err.to_string(), "Service URL is required");

        let err: WfsError = TransportError::EmptyBody {
            url: "http://example.com/wfs".to_string(),
        }
        .into();
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn test_retryable() {
        let url = "http://example.com".to_string();
        assert!(TransportError::Timeout { url: url.clone() }.is_retryable());
        assert!(TransportError::Status { url: url.clone(), status: 503 }.is_retryable());
        assert!(!TransportError::Status { url: url.clone(), status: 404 }.is_retryable());
        assert!(!TransportError::EmptyBody { url }.is_retryable());
        assert!(!TransportError::InvalidXml("eof".to_string()).is_retryable());
    }
}
