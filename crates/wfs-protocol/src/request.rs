//! KVP encoding of WFS requests.

use wfs_common::ProtocolVersion;

/// Value of the `service` parameter on every request.
pub const SERVICE: &str = "WFS";

/// GetCapabilities request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetCapabilitiesRequest {
    pub version: ProtocolVersion,
}

impl GetCapabilitiesRequest {
    pub fn new(version: ProtocolVersion) -> Self {
        Self { version }
    }

    /// Query parameters, in the order they are sent.
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("service", SERVICE.to_string()),
            ("request", "GetCapabilities".to_string()),
            ("version", self.version.to_string()),
        ]
    }
}
