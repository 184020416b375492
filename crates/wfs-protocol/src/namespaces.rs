//! Namespace prefix bindings used for qualified document lookups.

use std::collections::BTreeMap;

use wfs_common::ProtocolVersion;

use crate::document::CapabilitiesDocument;

pub const WFS_1: &str = "http://www.opengis.net/wfs";
pub const WFS_2: &str = "http://www.opengis.net/wfs/2.0";
pub const OWS_1_0: &str = "http://www.opengis.net/ows";
pub const OWS_1_1: &str = "http://www.opengis.net/ows/1.1";
pub const OGC: &str = "http://www.opengis.net/ogc";
pub const FES_2: &str = "http://www.opengis.net/fes/2.0";
pub const GML: &str = "http://www.opengis.net/gml";
pub const GML_3_2: &str = "http://www.opengis.net/gml/3.2";
pub const XLINK: &str = "http://www.w3.org/1999/xlink";
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Prefix to namespace URI map.
///
/// Prefixes here are independent of the ones a server happens to use in its
/// document; lookups compare resolved URIs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Namespaces {
    bindings: BTreeMap<String, String>,
}

impl Namespaces {
    /// Empty map. Only unqualified names resolve against it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Protocol bindings for a WFS version.
    pub fn for_version(version: &ProtocolVersion) -> Self {
        let mut ns = Self::new()
            .with("ogc", OGC)
            .with("fes", FES_2)
            .with("xlink", XLINK)
            .with("xsi", XSI);

        if version.major >= 2 {
            ns.insert("wfs", WFS_2);
            ns.insert("ows", OWS_1_1);
            ns.insert("gml", GML_3_2);
        } else {
            ns.insert("wfs", WFS_1);
            ns.insert("ows", OWS_1_0);
            ns.insert("gml", GML);
        }
        ns
    }

    /// Bindings matching a parsed document.
    ///
    /// The `wfs` prefix follows the root element's namespace when it is a
    /// known WFS namespace, otherwise the declared `version` attribute, and
    /// finally the 1.x defaults.
    pub fn for_document(doc: &CapabilitiesDocument) -> Self {
        match doc.root().namespace() {
            Some(WFS_2) => Self::for_version(&ProtocolVersion::V2_0_0),
            Some(WFS_1) => Self::for_version(&ProtocolVersion::V1_1_0),
            _ => {
                let version = doc
                    .declared_version()
                    .map(|declared| declared.release())
                    .unwrap_or(ProtocolVersion::V1_1_0);
                Self::for_version(&version)
            }
        }
    }

    pub fn with(mut self, prefix: &str, uri: &str) -> Self {
        self.insert(prefix, uri);
        self
    }

    pub fn insert(&mut self, prefix: &str, uri: &str) {
        self.bindings.insert(prefix.to_string(), uri.to_string());
    }

    pub fn uri(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Resolve `prefix:local` into `(namespace URI, local name)`.
    ///
    /// Unprefixed names resolve to no namespace. Returns `None` for unknown
    /// prefixes.
    pub fn resolve<'a>(&'a self, qname: &'a str) -> Option<(Option<&'a str>, &'a str)> {
        match qname.split_once(':') {
            Some((prefix, local)) => self.uri(prefix).map(|uri| (Some(uri), local)),
            None => Some((None, qname)),
        }
    }
}
