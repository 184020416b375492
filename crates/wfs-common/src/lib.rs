//! Common types shared by the WFS client crates.

pub mod error;
pub mod feature_type;
pub mod version;

pub use error::{ConfigError, NegotiationError, TransportError, WfsError, WfsResult};
pub use feature_type::FeatureTypeDescriptor;
pub use version::{DeclaredVersion, ProtocolVersion, VersionParseError, VersionRegistry};
