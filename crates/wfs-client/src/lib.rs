//! OGC Web Feature Service client.
//!
//! Negotiates a protocol version with the service, fetches its capabilities
//! and lists the feature types it publishes.
//!
//! ```ignore
//! use wfs_client::{ClientConfig, WfsClient};
//!
//! let client = WfsClient::new(ClientConfig::new("https://demo.geo-solutions.it/geoserver/wfs"))?;
//! for feature_type in client.feature_types().await? {
//!     println!("{:?}", feature_type.name);
//! }
//! ```

pub mod client;
pub mod config;
pub mod negotiate;
pub mod transport;

pub use client::WfsClient;
pub use config::{ClientConfig, TransportOptions};
pub use negotiate::{decide, Negotiation, NegotiationErrorKind, Negotiator, Step};
pub use transport::{parse_capabilities, CapabilitiesTransport, HttpTransport, RetryPolicy};

pub use wfs_common::{
    ConfigError, DeclaredVersion, FeatureTypeDescriptor, NegotiationError, ProtocolVersion,
    TransportError, VersionRegistry, WfsError, WfsResult,
};
