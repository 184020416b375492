//! Owned XML element tree for capabilities responses.
//!
//! Built from quick-xml's namespace-resolving reader. Whitespace-only text is
//! dropped, comments and processing instructions are ignored.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use thiserror::Error;

use wfs_common::DeclaredVersion;

use crate::namespaces::Namespaces;

/// Errors raised while parsing a capabilities body.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML syntax error: {0}")]
    Syntax(String),

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("unclosed element <{0}>")]
    Unclosed(String),
}

impl From<quick_xml::Error> for DocumentError {
    fn from(err: quick_xml::Error) -> Self {
        DocumentError::Syntax(err.to_string())
    }
}

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with its namespace already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn from_start(ns: ResolveResult<'_>, start: &BytesStart<'_>) -> Result<Self, DocumentError> {
        let namespace = match ns {
            ResolveResult::Bound(uri) => Some(String::from_utf8_lossy(uri.as_ref()).into_owned()),
            _ => None,
        };
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| DocumentError::Syntax(e.to_string()))?;
            let key = attr.key.as_ref();
            if key == b"xmlns" || key.starts_with(b"xmlns:") {
                continue;
            }
            let local = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((local, value));
        }

        Ok(Self {
            namespace,
            name,
            attributes,
            children: Vec::new(),
        })
    }

    /// Resolved namespace URI, if the element is in a namespace.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local name without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of this element and its descendants, trimmed.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out.trim().to_string()
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Whether this element matches a qualified name such as `wfs:Name`.
    pub fn is(&self, qname: &str, ns: &Namespaces) -> bool {
        match ns.resolve(qname) {
            Some((uri, local)) => self.name == local && self.namespace.as_deref() == uri,
            None => false,
        }
    }

    /// Elements reached by a relative path like `./wfs:FeatureTypeList/wfs:FeatureType`.
    pub fn find(&self, path: &str, ns: &Namespaces) -> Vec<&Element> {
        let mut current = vec![self];
        for step in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
            let mut next = Vec::new();
            for el in current {
                next.extend(el.children().filter(|child| child.is(step, ns)));
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }

    /// First element reached by a relative path.
    pub fn get(&self, path: &str, ns: &Namespaces) -> Option<&Element> {
        self.find(path, ns).into_iter().next()
    }
}

/// A parsed capabilities response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitiesDocument {
    root: Element,
}

impl CapabilitiesDocument {
    /// Parse an XML body.
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        let mut reader = NsReader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (ns, event) = reader.read_resolved_event()?;
            match event {
                Event::Start(start) => {
                    stack.push(Element::from_start(ns, &start)?);
                }
                Event::Empty(start) => {
                    let element = Element::from_start(ns, &start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    // quick-xml rejects mismatched end tags itself
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element)?;
                    }
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(Node::Text(text.unescape()?.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let text = String::from_utf8_lossy(&data).into_owned();
                        parent.children.push(Node::Text(text));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(DocumentError::Unclosed(open.name.clone()));
        }
        root.map(|root| Self { root }).ok_or(DocumentError::NoRoot)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Raw `version` attribute of the root element.
    pub fn version_attribute(&self) -> Option<&str> {
        self.root.attribute("version")
    }

    /// `version` attribute of the root element, if it is a valid semantic
    /// version.
    pub fn declared_version(&self) -> Option<DeclaredVersion> {
        self.version_attribute().and_then(DeclaredVersion::parse)
    }

    /// Elements reached by an absolute path like `/wfs:WFS_Capabilities/wfs:FeatureTypeList`.
    ///
    /// The first step must match the root element.
    pub fn find(&self, path: &str, ns: &Namespaces) -> Vec<&Element> {
        let mut steps = path.trim_start_matches('/').splitn(2, '/');
        match steps.next() {
            Some(first) if self.root.is(first, ns) => match steps.next() {
                Some(rest) => self.root.find(rest, ns),
                None => vec![&self.root],
            },
            _ => Vec::new(),
        }
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(DocumentError::MultipleRoots),
    }
}
