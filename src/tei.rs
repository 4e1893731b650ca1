//! TEI document access on top of `xot`.
//!
//! Wraps a parsed edition in a read-only facade: XInclude expansion happens
//! once at load time, after which the tree is only navigated. All helpers
//! work on TEI-namespaced elements; attributes are unprefixed except for
//! `xml:id`, which lives in the XML namespace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub const TEI_NS: &str = "http://www.tei-c.org/ns/1.0";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const XI_NS: &str = "http://www.w3.org/2001/XInclude";

/// A parsed TEI edition.
pub struct Tei {
    xot: xot::Xot,
    document: xot::Node,
    ids: HashMap<String, xot::Node>,
}

impl Tei {
    /// Parses an edition from a file, expanding XIncludes relative to the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_source(&source, path.parent().map(Path::to_path_buf))
    }

    /// Parses an edition from a string. XIncludes cannot be expanded without
    /// a base directory and are reported as errors if present.
    pub fn parse(source: &str) -> Result<Self> {
        Self::from_source(source, None)
    }

    fn from_source(source: &str, base: Option<PathBuf>) -> Result<Self> {
        let mut xot = xot::Xot::new();
        let document = xot.parse(source)?;
        expand_xincludes(&mut xot, document, base.as_deref())?;
        let ids = collect_ids(&xot, document);
        Ok(Self {
            xot,
            document,
            ids,
        })
    }

    /// The document element (`tei:TEI`).
    pub fn document_element(&self) -> Result<xot::Node> {
        Ok(self.xot.document_element(self.document)?)
    }

    /// Looks up an element by its `xml:id`.
    pub fn node_by_id(&self, id: &str) -> Option<xot::Node> {
        self.ids.get(id).copied()
    }

    pub fn is_element(&self, node: xot::Node) -> bool {
        matches!(self.xot.value(node), xot::Value::Element(_))
    }

    pub fn is_text(&self, node: xot::Node) -> bool {
        matches!(self.xot.value(node), xot::Value::Text(_))
    }

    /// Text content of a text node.
    pub fn text_value(&self, node: xot::Node) -> Option<&str> {
        match self.xot.value(node) {
            xot::Value::Text(text) => Some(text.get()),
            _ => None,
        }
    }

    /// Local name of a TEI-namespaced element, `None` for anything else.
    pub fn local_name(&self, node: xot::Node) -> Option<&str> {
        match self.xot.value(node) {
            xot::Value::Element(element) => {
                let (name, ns) = self.xot.name_ns_str(element.name());
                (ns == TEI_NS).then_some(name)
            }
            _ => None,
        }
    }

    /// True iff `node` is a TEI element with the given local name.
    pub fn is(&self, node: xot::Node, name: &str) -> bool {
        self.local_name(node) == Some(name)
    }

    /// An unprefixed attribute value.
    pub fn attr(&self, node: xot::Node, name: &str) -> Option<String> {
        let name_id = self.xot.name(name)?;
        self.xot.attributes(node).get(name_id).map(|v| v.to_string())
    }

    /// An attribute in the XML namespace (`xml:id`, `xml:lang`, …).
    pub fn xml_attr(&self, node: xot::Node, name: &str) -> Option<String> {
        let ns = self.xot.namespace(XML_NS)?;
        let name_id = self.xot.name_ns(name, ns)?;
        self.xot.attributes(node).get(name_id).map(|v| v.to_string())
    }

    /// The `xml:id` of an element.
    pub fn xml_id(&self, node: xot::Node) -> Option<String> {
        self.xml_attr(node, "id")
    }

    /// All attributes in document order as `(name, value)` pairs, with
    /// `xml:`-prefixed names for the XML namespace.
    pub fn attributes(&self, node: xot::Node) -> Vec<(String, String)> {
        self.xot
            .attributes(node)
            .iter()
            .map(|(name_id, value)| {
                let (local, ns) = self.xot.name_ns_str(name_id);
                let name = if ns == XML_NS {
                    format!("xml:{local}")
                } else {
                    local.to_string()
                };
                (name, value.to_string())
            })
            .collect()
    }

    pub fn parent(&self, node: xot::Node) -> Option<xot::Node> {
        self.xot.parent(node).filter(|p| self.is_element(*p))
    }

    /// Child nodes (elements, text, comments, PIs) in document order.
    pub fn children(&self, node: xot::Node) -> impl Iterator<Item = xot::Node> + '_ {
        self.xot.children(node)
    }

    /// Child elements in document order.
    pub fn child_elements(&self, node: xot::Node) -> impl Iterator<Item = xot::Node> + '_ {
        self.xot.children(node).filter(move |n| self.is_element(*n))
    }

    /// Proper ancestor elements, nearest first.
    pub fn ancestors(&self, node: xot::Node) -> impl Iterator<Item = xot::Node> + '_ {
        self.xot
            .ancestors(node)
            .skip(1)
            .filter(move |n| self.is_element(*n))
    }

    /// Descendant elements including `node` itself, in document order.
    pub fn descendants(&self, node: xot::Node) -> impl Iterator<Item = xot::Node> + '_ {
        self.xot.descendants(node).filter(move |n| self.is_element(*n))
    }

    /// Proper descendant elements, in document order.
    pub fn proper_descendants(&self, node: xot::Node) -> impl Iterator<Item = xot::Node> + '_ {
        self.xot
            .descendants(node)
            .skip(1)
            .filter(move |n| self.is_element(*n))
    }

    /// Descendant text nodes of a subtree, in document order.
    pub fn text_nodes(&self, node: xot::Node) -> impl Iterator<Item = xot::Node> + '_ {
        self.xot.descendants(node).filter(move |n| self.is_text(*n))
    }

    /// Preceding sibling nodes, in document order.
    pub fn preceding_siblings(&self, node: xot::Node) -> Vec<xot::Node> {
        match self.xot.parent(node) {
            Some(parent) => self
                .xot
                .children(parent)
                .take_while(|c| *c != node)
                .collect(),
            None => Vec::new(),
        }
    }

    /// First child element with the given TEI local name.
    pub fn find_child(&self, node: xot::Node, name: &str) -> Option<xot::Node> {
        self.child_elements(node).find(|n| self.is(*n, name))
    }

    /// First descendant element with the given TEI local name.
    pub fn find_descendant(&self, node: xot::Node, name: &str) -> Option<xot::Node> {
        self.proper_descendants(node).find(|n| self.is(*n, name))
    }

    /// Nearest ancestor with the given TEI local name.
    pub fn find_ancestor(&self, node: xot::Node, name: &str) -> Option<xot::Node> {
        self.ancestors(node).find(|n| self.is(*n, name))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn string_value(&self, node: xot::Node) -> String {
        let mut out = String::new();
        for n in self.xot.descendants(node) {
            if let Some(text) = self.text_value(n) {
                out.push_str(text);
            }
        }
        out
    }

    /// Serialises a subtree using local element names, optionally declaring
    /// the TEI namespace on the outermost element.
    pub fn serialize(&self, node: xot::Node, declare_ns: bool) -> String {
        let mut out = String::new();
        write_subtree(self, node, declare_ns, &mut out);
        out
    }
}

/// Collapses whitespace runs to a single space, keeping leading/trailing
/// runs as one space each.
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}

/// Collapses whitespace and trims the result.
pub fn normalize_space(s: &str) -> String {
    collapse_whitespace(s).trim().to_string()
}

fn collect_ids(xot: &xot::Xot, document: xot::Node) -> HashMap<String, xot::Node> {
    let mut ids = HashMap::new();
    let Some(ns) = xot.namespace(XML_NS) else {
        return ids;
    };
    let Some(id_name) = xot.name_ns("id", ns) else {
        return ids;
    };
    for node in xot.descendants(document) {
        if let xot::Value::Element(_) = xot.value(node) {
            if let Some(id) = xot.attributes(node).get(id_name) {
                ids.insert(id.to_string(), node);
            }
        }
    }
    ids
}

/// Replaces `xi:include` elements by the document elements of the referenced
/// files, repeatedly, so nested includes are expanded too.
fn expand_xincludes(
    xot: &mut xot::Xot,
    document: xot::Node,
    base: Option<&Path>,
) -> Result<()> {
    for _ in 0..1024 {
        let Some(include) = find_xinclude(xot, document) else {
            return Ok(());
        };
        let Some(base) = base else {
            return Err(Error::XInclude(
                "document has XIncludes but no base directory is known".to_string(),
            ));
        };
        let href = xinclude_href(xot, include).ok_or_else(|| {
            Error::XInclude("xi:include without @href".to_string())
        })?;
        let path = base.join(&href);
        let source = std::fs::read_to_string(&path).map_err(|e| {
            Error::XInclude(format!("{}: {e}", path.display()))
        })?;
        let included = xot.parse(&source)?;
        let included_root = xot.document_element(included)?;
        xot.replace(include, included_root)?;
    }
    Err(Error::XInclude(
        "too many XInclude expansions; is the inclusion circular?".to_string(),
    ))
}

fn find_xinclude(xot: &xot::Xot, document: xot::Node) -> Option<xot::Node> {
    xot.descendants(document).find(|node| {
        if let xot::Value::Element(element) = xot.value(*node) {
            let (name, ns) = xot.name_ns_str(element.name());
            name == "include" && ns == XI_NS
        } else {
            false
        }
    })
}

fn xinclude_href(xot: &xot::Xot, include: xot::Node) -> Option<String> {
    let name_id = xot.name("href")?;
    xot.attributes(include).get(name_id).map(|v| v.to_string())
}

fn write_subtree(tei: &Tei, node: xot::Node, declare_ns: bool, out: &mut String) {
    match tei.xot.value(node) {
        xot::Value::Element(_) => {
            let name = tei
                .local_name(node)
                .unwrap_or("unknown")
                .to_string();
            out.push('<');
            out.push_str(&name);
            if declare_ns {
                out.push_str(&format!(" xmlns=\"{TEI_NS}\""));
            }
            for (attr_name, value) in tei.attributes(node) {
                out.push_str(&format!(
                    " {attr_name}=\"{}\"",
                    quick_xml::escape::escape(value.as_str())
                ));
            }
            let mut children = tei.children(node).peekable();
            if children.peek().is_none() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in children {
                    write_subtree(tei, child, false, out);
                }
                out.push_str(&format!("</{name}>"));
            }
        }
        xot::Value::Text(text) => {
            out.push_str(&quick_xml::escape::escape(text.get()));
        }
        xot::Value::Comment(comment) => {
            out.push_str(&format!("<!--{}-->", comment.get()));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader/>
  <text xml:id="t1"><body><div type="chapter" xml:id="c1"><p xml:id="p1">Hello <hi rendition="#it">world</hi>.</p></div></body></text>
</TEI>"##;

    #[test]
    fn navigation_and_ids() {
        let tei = Tei::parse(SAMPLE).unwrap();
        let p1 = tei.node_by_id("p1").unwrap();
        assert_eq!(tei.local_name(p1), Some("p"));
        let c1 = tei.node_by_id("c1").unwrap();
        assert_eq!(tei.attr(c1, "type").as_deref(), Some("chapter"));
        assert!(tei.ancestors(p1).any(|a| a == c1));
        assert_eq!(tei.xml_id(c1).as_deref(), Some("c1"));
        assert!(tei.find_ancestor(p1, "body").is_some());
    }

    #[test]
    fn string_value_concatenates_text() {
        let tei = Tei::parse(SAMPLE).unwrap();
        let p1 = tei.node_by_id("p1").unwrap();
        assert_eq!(tei.string_value(p1), "Hello world.");
    }

    #[test]
    fn collapse_keeps_boundary_space() {
        assert_eq!(collapse_whitespace("a \n b"), "a b");
        assert_eq!(collapse_whitespace(" a  b "), " a b ");
        assert_eq!(normalize_space("  a \t b \n"), "a b");
    }

    #[test]
    fn serializes_subtree_with_namespace() {
        let tei = Tei::parse(SAMPLE).unwrap();
        let p1 = tei.node_by_id("p1").unwrap();
        let xml = tei.serialize(p1, true);
        assert_eq!(
            xml,
            "<p xmlns=\"http://www.tei-c.org/ns/1.0\" xml:id=\"p1\">Hello <hi rendition=\"#it\">world</hi>.</p>"
        );
    }
}
