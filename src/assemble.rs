//! Fragment assembly.
//!
//! Combines resolved index entries with renderer output into per-fragment
//! records, wraps each basic node's markup in its ancestor chain so the
//! fragment is self-contained, and serialises the index artefacts.

use ego_tree::NodeRef;
use serde::Serialize;

use crate::config::WorkConfig;
use crate::index::{IndexNode, WorkIndex};
use crate::render::{Mode, Renderer, fragment_string};
use crate::tei::{TEI_NS, Tei};
use crate::Result;

/// One passage record of the `resources.json` artefact.
#[derive(Debug, Clone, Serialize)]
pub struct PassageRecord {
    pub id: String,
    pub citetrail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passagetrail: Option<String>,
    #[serde(rename = "citeType")]
    pub cite_type: String,
    pub level: usize,
    #[serde(rename = "citeDepth")]
    pub cite_depth: usize,
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    pub basic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txt_edit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txt_orig: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tei: Option<String>,
}

/// Builds the passage records of a resolved index. Links are emitted as
/// citetrails; basic nodes carry their rendered content.
pub fn assemble(tei: &Tei, cfg: &WorkConfig, index: &WorkIndex) -> Result<Vec<PassageRecord>> {
    let renderer = Renderer::new(tei, cfg);
    let mut records = Vec::new();
    for node in index.nodes() {
        let value = node.value();
        let as_citetrail =
            |id: &Option<String>| id.as_deref().and_then(|i| cfg.citetrail(i)).map(String::from);
        let mut record = PassageRecord {
            id: value.id.clone(),
            citetrail: value.citetrail.clone().unwrap_or_default(),
            passagetrail: value.passagetrail.clone().filter(|p| !p.is_empty()),
            cite_type: value.cite_type.clone(),
            level: value.level,
            cite_depth: cfg.cite_depth(),
            position: value.position.unwrap_or_default(),
            up: as_citetrail(&value.citetrail_parent),
            prev: as_citetrail(&value.prev),
            next: as_citetrail(&value.next),
            members: value
                .members
                .iter()
                .filter_map(|m| cfg.citetrail(m))
                .map(String::from)
                .collect(),
            basic: value.basic,
            txt_edit: None,
            txt_orig: None,
            html: None,
            tei: None,
        };
        if value.basic {
            record.txt_edit = Some(fragment_string(&renderer.txt(value.source, Mode::Edit)?));
            record.txt_orig = Some(fragment_string(&renderer.txt(value.source, Mode::Orig)?));
            record.html = Some(renderer.html(value.source)?.into_string());
            record.tei = Some(wrap_in_ancestors(tei, value.source));
        }
        records.push(record);
    }
    Ok(records)
}

/// Wraps a TEI node in copies of its ancestor elements (attributes
/// included), declaring the TEI namespace on the outermost wrapper, so the
/// fragment parses on its own.
pub fn wrap_in_ancestors(tei: &Tei, node: xot::Node) -> String {
    let ancestors: Vec<xot::Node> = tei
        .ancestors(node)
        .filter(|a| {
            !(tei.is(*a, "TEI")
                || (tei.is(*a, "text") && tei.attr(*a, "type").as_deref() == Some("work_part")))
        })
        .collect();
    let mut out = tei.serialize(node, ancestors.is_empty());
    for (i, ancestor) in ancestors.iter().enumerate() {
        let outermost = i == ancestors.len() - 1;
        let name = tei.local_name(*ancestor).unwrap_or("unknown").to_string();
        let mut open = format!("<{name}");
        if outermost {
            open.push_str(&format!(" xmlns=\"{TEI_NS}\""));
        }
        for (attr_name, attr_value) in tei.attributes(*ancestor) {
            open.push_str(&format!(
                " {attr_name}=\"{}\"",
                quick_xml::escape::escape(attr_value.as_str())
            ));
        }
        out = format!("{open}>{out}</{name}>");
    }
    out
}

/// Serialises the preliminary (nested) or resolved (flat) index.
pub fn index_to_xml(index: &WorkIndex, resolved: bool) -> String {
    let mut out = String::from("<workIndex>\n");
    if resolved {
        for node in index.nodes() {
            out.push_str("  ");
            write_node(node.value(), resolved, &mut out);
            out.push('\n');
        }
    } else {
        for child in index.tree.root().children() {
            write_nested(child, 1, &mut out);
        }
    }
    out.push_str("</workIndex>\n");
    out
}

fn write_nested(node: NodeRef<'_, IndexNode>, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&indent);
    write_node(node.value(), false, out);
    let mut children = node.children().peekable();
    if children.peek().is_some() {
        // reopen the element to hold the children wrapper
        truncate_self_close(out);
        out.push_str(&format!("\n{indent}  <children>\n"));
        for child in children {
            write_nested(child, depth + 2, out);
        }
        out.push_str(&format!("{indent}  </children>\n{indent}</node>\n"));
    } else {
        out.push('\n');
    }
}

/// Replaces a trailing `/>` with `>` so children can be appended.
fn truncate_self_close(out: &mut String) {
    if out.ends_with("/>") {
        out.truncate(out.len() - 2);
        out.push('>');
    }
}

fn write_node(value: &IndexNode, resolved: bool, out: &mut String) {
    let esc = |s: &str| quick_xml::escape::escape(s).to_string();
    out.push_str(&format!("<node id=\"{}\"", esc(&value.id)));
    out.push_str(&format!(" name=\"{}\"", esc(&value.name)));
    out.push_str(&format!(" type=\"{}\"", value.elem_type.as_str()));
    if value.basic {
        out.push_str(" basic=\"true\"");
    }
    out.push_str(&format!(" level=\"{}\"", value.level));
    if !value.cite_type.is_empty() {
        out.push_str(&format!(" citeType=\"{}\"", esc(&value.cite_type)));
    }
    if !value.title.is_empty() {
        out.push_str(&format!(" title=\"{}\"", esc(&value.title)));
    }
    if let Some(parent) = &value.citetrail_parent {
        out.push_str(&format!(" citetrailParent=\"{}\"", esc(parent)));
    }
    if let Some(level) = value.list_level {
        out.push_str(&format!(" listLevel=\"{level}\""));
    }
    if let Some(parent) = &value.list_parent {
        out.push_str(&format!(" listParent=\"{}\"", esc(parent)));
    }
    if resolved {
        if let Some(citetrail) = &value.citetrail {
            out.push_str(&format!(" citetrail=\"{}\"", esc(citetrail)));
        }
        if let Some(passagetrail) = &value.passagetrail {
            if !passagetrail.is_empty() {
                out.push_str(&format!(" passagetrail=\"{}\"", esc(passagetrail)));
            }
        }
        if let Some(position) = value.position {
            out.push_str(&format!(" position=\"{position}\""));
        }
        if let Some(prev) = &value.prev {
            out.push_str(&format!(" prev=\"{}\"", esc(prev)));
        }
        if let Some(next) = &value.next {
            out.push_str(&format!(" next=\"{}\"", esc(next)));
        }
        if !value.members.is_empty() {
            out.push_str(&format!(" members=\"{}\"", esc(&value.members.join(";"))));
        }
    } else {
        if !value.cite_stem.is_empty() {
            out.push_str(&format!(" citetrail=\"{}\"", esc(&value.cite_stem)));
        }
        if let Some(stem) = &value.passage_stem {
            out.push_str(&format!(" passagetrail=\"{}\"", esc(stem)));
        }
    }
    out.push_str("/>");
}
