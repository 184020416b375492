//! Common capabilities fixtures for WFS client tests.
//!
//! Documents follow the shape real servers (GeoServer, MapServer, deegree)
//! return, trimmed to the elements the client reads.

/// A feature type entry to render into a capabilities document.
#[derive(Debug, Clone, Default)]
pub struct FeatureTypeFixture {
    pub name: Option<String>,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
}

impl FeatureTypeFixture {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn abstract_text(mut self, text: &str) -> Self {
        self.abstract_text = Some(text.to_string());
        self
    }
}

/// WFS 1.x namespace
pub const WFS_1_NS: &str = "http://www.opengis.net/wfs";

/// WFS 2.0 namespace
pub const WFS_2_NS: &str = "http://www.opengis.net/wfs/2.0";

/// Render a capabilities document declaring `version`.
///
/// Versions starting with `2.` use the WFS 2.0 namespace as the default
/// namespace; anything else uses the 1.x namespace with a `wfs:` prefix.
pub fn capabilities_xml(version: &str, feature_types: &[FeatureTypeFixture]) -> String {
    capabilities_with_root_attrs(&format!("version=\"{}\"", escape(version)), version, feature_types)
}

/// Render a capabilities document whose root carries no `version` attribute.
pub fn capabilities_without_version(feature_types: &[FeatureTypeFixture]) -> String {
    capabilities_with_root_attrs("", "1.1.0", feature_types)
}

fn capabilities_with_root_attrs(
    root_attrs: &str,
    version: &str,
    feature_types: &[FeatureTypeFixture],
) -> String {
    let (prefix, ns_decl) = if version.starts_with("2.") {
        ("", format!("xmlns=\"{}\"", WFS_2_NS))
    } else {
        ("wfs:", format!("xmlns:wfs=\"{}\"", WFS_1_NS))
    };

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!(
        "<{p}WFS_Capabilities {attrs} {ns} xmlns:ows=\"http://www.opengis.net/ows\">\n",
        p = prefix,
        attrs = root_attrs,
        ns = ns_decl
    ));
    xml.push_str("  <ows:ServiceIdentification><ows:Title>Mock WFS</ows:Title></ows:ServiceIdentification>\n");
    xml.push_str(&format!("  <{}FeatureTypeList>\n", prefix));
    for ft in feature_types {
        xml.push_str(&format!("    <{}FeatureType>\n", prefix));
        for (tag, value) in [
            ("Name", &ft.name),
            ("Title", &ft.title),
            ("Abstract", &ft.abstract_text),
        ] {
            if let Some(value) = value {
                xml.push_str(&format!(
                    "      <{p}{t}>{v}</{p}{t}>\n",
                    p = prefix,
                    t = tag,
                    v = escape(value)
                ));
            }
        }
        xml.push_str(&format!("    </{}FeatureType>\n", prefix));
    }
    xml.push_str(&format!("  </{}FeatureTypeList>\n", prefix));
    xml.push_str(&format!("</{}WFS_Capabilities>\n", prefix));
    xml
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Capabilities with service metadata but no `FeatureTypeList`.
pub const CAPABILITIES_WITHOUT_FEATURE_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:WFS_Capabilities version="1.1.0" xmlns:wfs="http://www.opengis.net/wfs" xmlns:ows="http://www.opengis.net/ows">
  <ows:ServiceIdentification>
    <ows:Title>Empty service</ows:Title>
  </ows:ServiceIdentification>
</wfs:WFS_Capabilities>
"#;

/// OWS 1.1 exception report, as returned for an unsupported request.
pub const OWS_EXCEPTION_REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport version="2.0.0" xmlns:ows="http://www.opengis.net/ows/1.1">
  <ows:Exception exceptionCode="InvalidParameterValue" locator="version">
    <ows:ExceptionText>Unsupported version 3.0.0</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>
"#;

/// Common feature type sets.
pub mod feature_types {
    use super::FeatureTypeFixture;

    /// The GeoServer demo layers.
    pub fn geoserver_demo() -> Vec<FeatureTypeFixture> {
        vec![
            FeatureTypeFixture::new("topp:states")
                .title("USA Population")
                .abstract_text("This is some census data on the states."),
            FeatureTypeFixture::new("tiger:poi").title("Manhattan (NY) points of interest"),
            FeatureTypeFixture::new("sf:roads").title("Spearfish roads"),
        ]
    }
}
