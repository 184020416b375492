//! OGC WFS protocol support for capability discovery.
//!
//! Supports:
//! - GetCapabilities KVP requests for WFS 1.0.0, 1.1.0 and 2.0.0
//! - Parsing capabilities responses into an owned element tree
//! - Namespace-qualified lookups with an explicit prefix map
//! - Extracting the feature type catalog

pub mod capabilities;
pub mod document;
pub mod namespaces;
pub mod request;

pub use capabilities::{extract_feature_types, service_exception, ServiceException, FEATURE_TYPE_PATH};
pub use document::{CapabilitiesDocument, DocumentError, Element, Node};
pub use namespaces::Namespaces;
pub use request::GetCapabilitiesRequest;
