//! Interpretation of WFS GetCapabilities responses.

use tracing::debug;

use wfs_common::FeatureTypeDescriptor;

use crate::document::{CapabilitiesDocument, Element};
use crate::namespaces::Namespaces;

/// Location of feature type entries in a capabilities document.
pub const FEATURE_TYPE_PATH: &str = "/wfs:WFS_Capabilities/wfs:FeatureTypeList/wfs:FeatureType";

/// List the feature types advertised by a capabilities document.
///
/// Missing `FeatureTypeList` yields an empty list. Entries keep document order
/// and empty child elements are left out of the descriptor.
pub fn extract_feature_types(
    doc: &CapabilitiesDocument,
    ns: &Namespaces,
) -> Vec<FeatureTypeDescriptor> {
    let nodes = doc.find(FEATURE_TYPE_PATH, ns);
    debug!(count = nodes.len(), "Extracting feature types");
    nodes.into_iter().map(|node| describe(node, ns)).collect()
}

fn describe(node: &Element, ns: &Namespaces) -> FeatureTypeDescriptor {
    let text_of = |path: &str| {
        node.get(path, ns)
            .map(Element::text)
            .filter(|text| !text.is_empty())
    };

    let mut feature_type = FeatureTypeDescriptor {
        title: text_of("./wfs:Title"),
        abstract_text: text_of("./wfs:Abstract"),
        ..Default::default()
    };
    if let Some(name) = text_of("./wfs:Name") {
        feature_type = feature_type.with_qualified_name(&name);
    }
    feature_type
}

/// An OGC exception report returned in place of capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceException {
    pub code: String,
    pub message: String,
}

/// Detect an `ows:ExceptionReport` (1.1/2.0) or `ServiceExceptionReport` (1.0) root.
///
/// Matched by local name so that any OWS or OGC namespace revision is accepted.
pub fn service_exception(doc: &CapabilitiesDocument) -> Option<ServiceException> {
    let root = doc.root();
    let (exception, code_attr) = match root.name() {
        "ExceptionReport" => (root.children().find(|el| el.name() == "Exception"), "exceptionCode"),
        "ServiceExceptionReport" => (
            root.children().find(|el| el.name() == "ServiceException"),
            "code",
        ),
        _ => return None,
    };

    let Some(exception) = exception else {
        return Some(ServiceException {
            code: "NoApplicableCode".to_string(),
            message: root.text(),
        });
    };

    // OWS wraps the message in ExceptionText; WFS 1.0 puts it inline
    let message = exception
        .children()
        .find(|el| el.name() == "ExceptionText")
        .map(Element::text)
        .unwrap_or_else(|| exception.text());

    Some(ServiceException {
        code: exception
            .attribute(code_attr)
            .unwrap_or("NoApplicableCode")
            .to_string(),
        message,
    })
}
