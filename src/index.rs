//! Structural analysis and node indexing.
//!
//! A depth-first pass over the TEI tree emits one index node per citable
//! element. Elements without a role or an `xml:id` are transparent: their
//! citable descendants are hoisted into the caller's child list, so the
//! index is a compressed view of the document structure.

use std::collections::HashMap;

use ego_tree::{NodeId, NodeRef, Tree};
use regex::Regex;

use crate::classify::{self, ElemType};
use crate::config::{PASSAGE_TEASER_LENGTH, TEASER_LENGTH, WorkConfig, citation_label};
use crate::render::{Mode, Renderer};
use crate::tei::{Tei, normalize_space};
use crate::{Error, Result};

/// One citable node of the work.
///
/// The indexer fills everything up to `title`; the resolver writes the
/// remaining fields in a second pass.
#[derive(Debug, Clone)]
pub struct IndexNode {
    pub id: String,
    pub name: String,
    pub elem_type: ElemType,
    pub basic: bool,
    pub source: xot::Node,
    /// Preliminary citetrail fragment, before sibling disambiguation.
    pub cite_stem: String,
    /// `xml:id` of the nearest citetrail-eligible ancestor.
    pub citetrail_parent: Option<String>,
    /// Preliminary passagetrail fragment.
    pub passage_stem: Option<String>,
    /// `xml:id` of the nearest passagetrail-contributing ancestor.
    pub passage_parent: Option<String>,
    /// Number of passagetrail-contributing ancestors.
    pub passage_ancestors: usize,
    /// Depth in the citetrail hierarchy, starting at 1.
    pub level: usize,
    pub cite_type: String,
    pub title: String,
    /// Nesting depth for basic list nodes.
    pub list_level: Option<usize>,
    /// `xml:id` of the nearest enclosing list for basic list nodes.
    pub list_parent: Option<String>,

    // resolved
    pub citetrail: Option<String>,
    pub passagetrail: Option<String>,
    pub position: Option<usize>,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub members: Vec<String>,
}

impl IndexNode {
    /// The tree root is a sentinel that stands for the whole `tei:text`; it
    /// carries no identifier and is skipped by [`WorkIndex::nodes`].
    fn sentinel(source: xot::Node) -> Self {
        Self {
            id: String::new(),
            name: "text".to_string(),
            elem_type: ElemType::Structural,
            basic: false,
            source,
            cite_stem: String::new(),
            citetrail_parent: None,
            passage_stem: None,
            passage_parent: None,
            passage_ancestors: 0,
            level: 0,
            cite_type: String::new(),
            title: String::new(),
            list_level: None,
            list_parent: None,
            citetrail: None,
            passagetrail: None,
            position: None,
            prev: None,
            next: None,
            members: Vec::new(),
        }
    }
}

/// The index of a work: a tree of citable nodes below a sentinel root.
pub struct WorkIndex {
    pub tree: Tree<IndexNode>,
}

impl WorkIndex {
    /// All index nodes in document order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_, IndexNode>> {
        self.tree.root().descendants().skip(1)
    }

    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes().next().is_none()
    }

    /// Finds an index node by its `xml:id`.
    pub fn by_id(&self, id: &str) -> Option<NodeRef<'_, IndexNode>> {
        self.nodes().find(|n| n.value().id == id)
    }
}

/// Result of indexing one source element: a classified element yields a
/// single attached node, a transparent one the hoisted list of whatever its
/// children produced.
enum Indexed {
    One(NodeId),
    Hoisted(Vec<NodeId>),
}

impl Indexed {
    fn into_ids(self) -> Vec<NodeId> {
        match self {
            Indexed::One(id) => vec![id],
            Indexed::Hoisted(ids) => ids,
        }
    }
}

/// Builds the preliminary index of a work.
pub fn build_index(tei: &Tei, cfg: &mut WorkConfig) -> Result<WorkIndex> {
    let root = tei.document_element()?;
    let text = tei
        .find_child(root, "text")
        .ok_or_else(|| Error::markup("work has no tei:text"))?;
    let mut builder = IndexBuilder {
        tei,
        cfg,
        levels: HashMap::new(),
        ref_targets: collect_ref_targets(tei, text),
    };
    let mut tree = Tree::new(IndexNode::sentinel(text));
    let root_id = tree.root().id();
    builder.collect(&mut tree, root_id, text)?;
    Ok(WorkIndex { tree })
}

/// First referencing `tei:ref` per in-work target, for title fallbacks.
fn collect_ref_targets(tei: &Tei, text: xot::Node) -> HashMap<String, xot::Node> {
    let mut targets = HashMap::new();
    for node in tei.proper_descendants(text) {
        if !tei.is(node, "ref") {
            continue;
        }
        if let Some(target) = tei.attr(node, "target") {
            if let Some(id) = target.strip_prefix('#') {
                targets.entry(id.to_string()).or_insert(node);
            }
        }
    }
    targets
}

struct IndexBuilder<'a> {
    tei: &'a Tei,
    cfg: &'a mut WorkConfig,
    /// Citetrail level per indexed `xml:id`, for the level arithmetic.
    levels: HashMap<String, usize>,
    ref_targets: HashMap<String, xot::Node>,
}

impl IndexBuilder<'_> {
    fn collect(
        &mut self,
        tree: &mut Tree<IndexNode>,
        parent: NodeId,
        el: xot::Node,
    ) -> Result<Indexed> {
        if !self.tei.is_element(el) {
            return Ok(Indexed::Hoisted(Vec::new()));
        }
        let elem_type = classify::elem_type(self.tei, el);
        let xml_id = self.tei.xml_id(el);
        let (Some(id), Some(elem_type)) = (xml_id, elem_type) else {
            let mut ids = Vec::new();
            for child in self.tei.children(el) {
                ids.extend(self.collect(tree, parent, child)?.into_ids());
            }
            return Ok(Indexed::Hoisted(ids));
        };

        if self.levels.contains_key(&id) {
            return Err(Error::NodeIndexing(format!(
                "duplicate xml:id in citable structure: {id}"
            )));
        }
        let node = self.make_node(el, &id, elem_type)?;
        let node_id = tree
            .get_mut(parent)
            .expect("parent node is part of the tree")
            .append(node)
            .id();
        for child in self.tei.children(el) {
            self.collect(tree, node_id, child)?;
        }
        Ok(Indexed::One(node_id))
    }

    fn make_node(&mut self, el: xot::Node, id: &str, elem_type: ElemType) -> Result<IndexNode> {
        let tei = self.tei;
        let name = tei.local_name(el).unwrap_or_default().to_string();
        let basic = classify::is_basic_elem(tei, el);

        let cite_stem = normalize_space(&format!(
            "{}{}",
            citetrail_prefix(tei, el, elem_type),
            citetrail_infix(tei, el, elem_type)
        ));
        let citetrail_parent = citable_parent(tei, el, elem_type);
        let level = citetrail_parent
            .as_deref()
            .and_then(|pid| self.levels.get(pid))
            .map_or(1, |parent_level| parent_level + 1);
        self.levels.insert(id.to_string(), level);
        self.cfg.observe_level(level);

        let passage_stem = self.passage_stem(el, elem_type)?;
        // passagetrails concatenate along the same parent axis as citetrails;
        // ancestors without a fragment of their own are transparent
        let passage_parent = citetrail_parent.clone();
        let passage_ancestors = tei.ancestors(el).filter(|a| is_citeref(tei, *a)).count();

        let (list_level, list_parent) = if basic && elem_type == ElemType::List {
            let lists: Vec<_> = tei
                .ancestors(el)
                .filter(|a| tei.is(*a, "list"))
                .collect();
            let nearest = lists.first().and_then(|l| tei.xml_id(*l));
            (Some(lists.len()), nearest)
        } else {
            (None, None)
        };

        if elem_type == ElemType::Page {
            if let Some(facs) = tei.attr(el, "facs") {
                self.cfg.register_page(&facs, id);
            }
        }

        Ok(IndexNode {
            id: id.to_string(),
            name,
            elem_type,
            basic,
            source: el,
            cite_stem,
            citetrail_parent,
            passage_stem,
            passage_parent,
            passage_ancestors,
            level,
            cite_type: cite_type(tei, el, elem_type),
            title: self.node_title(el)?,
            list_level,
            list_parent,
            citetrail: None,
            passagetrail: None,
            position: None,
            prev: None,
            next: None,
            members: Vec::new(),
        })
    }

    /// Human teaser for a node, derived from `@n`, heads, labels, or a
    /// reference pointing at the node.
    fn node_title(&self, el: xot::Node) -> Result<String> {
        let tei = self.tei;
        let name = tei.local_name(el).unwrap_or_default();
        let n = tei.attr(el, "n");
        let numeric = Regex::new(r"^[\d\[\]]+$").expect("static regex");
        let named_n = n.as_deref().filter(|v| !numeric.is_match(v));

        let title = match name {
            "div" | "list" => {
                if let Some(n) = named_n {
                    format!("\"{n}\"")
                } else if let Some(head) = tei.find_child(el, "head") {
                    self.teaser(head, TEASER_LENGTH, true)?
                } else if let Some(label) = tei.find_child(el, "label") {
                    self.teaser(label, TEASER_LENGTH, true)?
                } else if let (Some(n), true) = (n.as_deref(), tei.attr(el, "type").is_some()) {
                    n.to_string()
                } else if let Some(reference) = self.ref_to(el) {
                    self.teaser(reference, TEASER_LENGTH, true)?
                } else {
                    String::new()
                }
            }
            "item" => {
                if let Some(n) = named_n {
                    format!("\"{n}\"")
                } else if let Some(head) = tei.find_child(el, "head") {
                    self.teaser(head, TEASER_LENGTH, true)?
                } else if let Some(label) = tei.find_child(el, "label") {
                    self.teaser(label, TEASER_LENGTH, true)?
                } else if let Some(n) = n.as_deref() {
                    n.to_string()
                } else if let Some(reference) = self.ref_to(el) {
                    self.teaser(reference, TEASER_LENGTH, true)?
                } else {
                    String::new()
                }
            }
            "lg" => {
                if let Some(head) = tei.find_child(el, "head") {
                    self.teaser(head, TEASER_LENGTH, true)?
                } else {
                    self.teaser(el, TEASER_LENGTH, true)?
                }
            }
            "milestone" => {
                if let Some(n) = named_n {
                    format!("\"{n}\"")
                } else if let Some(n) = n.as_deref() {
                    n.to_string()
                } else if let Some(reference) = self.ref_to(el) {
                    self.teaser(reference, TEASER_LENGTH, true)?
                } else {
                    String::new()
                }
            }
            "note" => n.as_deref().map(|v| format!("\"{v}\"")).unwrap_or_default(),
            "pb" => match n.as_deref() {
                Some(v) if v.starts_with("fol.") => v.to_string(),
                Some(v) => format!("p. {v}"),
                None => String::new(),
            },
            "text" => {
                if tei.attr(el, "type").as_deref() == Some("work_volume") {
                    n.unwrap_or_default()
                } else {
                    String::new()
                }
            }
            "head" | "label" | "p" | "signed" | "titlePart" => {
                self.teaser(el, TEASER_LENGTH, true)?
            }
            _ => String::new(),
        };
        Ok(title)
    }

    /// Shortened edited-mode reading of an element, with reference and note
    /// tokens stripped.
    fn teaser(&self, el: xot::Node, length: usize, quoted: bool) -> Result<String> {
        let renderer = Renderer::new(self.tei, &*self.cfg);
        let text = renderer.txt(el, Mode::Edit)?;
        let brackets = Regex::new(r"\[.*?\]").expect("static regex");
        let braces = Regex::new(r"\{.*?\}").expect("static regex");
        let bracket_stripped = brackets.replace_all(&text, "");
        let stripped = braces.replace_all(&bracket_stripped, "");
        let normalized = normalize_space(&stripped);
        let truncated: String = normalized.chars().take(length).collect();
        let (body, ellipsis) = if truncated.len() < normalized.len() {
            (normalize_space(&truncated), "…")
        } else {
            (normalized, "")
        };
        if quoted {
            Ok(format!("\"{body}{ellipsis}\""))
        } else {
            Ok(format!("{body}{ellipsis}"))
        }
    }

    /// A `tei:ref` in the running text pointing at this element.
    fn ref_to(&self, el: xot::Node) -> Option<xot::Node> {
        let id = self.tei.xml_id(el)?;
        self.ref_targets.get(&id).copied()
    }

    /// Preliminary passagetrail fragment; only citeref nodes contribute one.
    fn passage_stem(&self, el: xot::Node, elem_type: ElemType) -> Result<Option<String>> {
        let tei = self.tei;
        let n = tei.attr(el, "n");
        let stem = match elem_type {
            ElemType::Page => {
                let number = n.or_else(|| {
                    tei.attr(el, "facs")
                        .map(|f| f.get(5..).unwrap_or_default().to_string())
                });
                Some(match number {
                    Some(number) => format!("pag. {number}"),
                    None => "pag.".to_string(),
                })
            }
            ElemType::Marginal => Some(match n {
                Some(n) => format!("not. {n}"),
                None => "not.".to_string(),
            }),
            ElemType::Anchor => {
                let unit = tei.attr(el, "unit").unwrap_or_default();
                citation_label(&unit)
                    .filter(|l| l.cite_ref)
                    .map(|l| join_label(l.abbr, n.as_deref()))
            }
            ElemType::Structural => {
                if tei.is(el, "text") {
                    Some(join_label("vol.", n.as_deref()))
                } else if tei.is(el, "div") {
                    let div_type = tei.attr(el, "type").unwrap_or_default();
                    match citation_label(&div_type).filter(|l| l.cite_ref) {
                        Some(label) if matches!(div_type.as_str(), "lecture" | "gloss") => {
                            let teaser = match tei.find_child(el, "head") {
                                Some(head) => {
                                    self.teaser(head, PASSAGE_TEASER_LENGTH, false)?
                                }
                                None => String::new(),
                            };
                            Some(join_label(label.abbr, Some(teaser.as_str())))
                        }
                        Some(label) => Some(join_label(label.abbr, n.as_deref())),
                        None => None,
                    }
                } else {
                    let name = tei.local_name(el).unwrap_or_default();
                    citation_label(name)
                        .filter(|l| l.cite_ref)
                        .map(|l| join_label(l.abbr, n.as_deref()))
                }
            }
            ElemType::Main | ElemType::List => {
                let name = tei.local_name(el).unwrap_or_default();
                citation_label(name)
                    .filter(|l| l.cite_ref)
                    .map(|l| join_label(l.abbr, n.as_deref()))
            }
        };
        Ok(stem.map(|s| normalize_space(&s)).filter(|s| !s.is_empty()))
    }
}

fn join_label(abbr: &str, n: Option<&str>) -> String {
    match n {
        Some(n) if !n.is_empty() => format!("{abbr} {n}"),
        _ => abbr.to_string(),
    }
}

/// Citetrail prefixes are categorical keywords derived from role and tag.
fn citetrail_prefix(tei: &Tei, el: xot::Node, elem_type: ElemType) -> String {
    let prefix = match elem_type {
        ElemType::Page => "p",
        ElemType::Marginal => "n",
        ElemType::Anchor => {
            return tei.attr(el, "unit").unwrap_or_default();
        }
        ElemType::Structural => {
            if tei.is(el, "front") {
                "frontmatter"
            } else if tei.is(el, "back") {
                "backmatter"
            } else if tei.is(el, "text") {
                "vol"
            } else if tei.is(el, "div") {
                // divisions are named by their citation label; the trailing
                // abbreviation dot doubles as the separator before the number
                return tei
                    .attr(el, "type")
                    .and_then(|t| citation_label(&t))
                    .map(|l| l.abbr.to_string())
                    .unwrap_or_default();
            } else {
                ""
            }
        }
        ElemType::Main => {
            if tei.is(el, "head") {
                "heading"
            } else if tei.is(el, "titlePage") {
                "titlepage"
            } else {
                ""
            }
        }
        ElemType::List => {
            if tei.is(el, "list") {
                match tei.attr(el, "type").as_deref() {
                    Some("dict") => "dict",
                    Some("index") => "index",
                    _ => "",
                }
            } else if tei.is(el, "item")
                && tei
                    .ancestors(el)
                    .any(|a| tei.is(a, "list") && tei.attr(a, "type").as_deref() == Some("dict"))
            {
                "entry"
            } else {
                ""
            }
        }
    };
    prefix.to_string()
}

/// Citetrail infixes are speaking names derived from attributes.
fn citetrail_infix(tei: &Tei, el: xot::Node, elem_type: ElemType) -> String {
    let strip = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase()
    };
    match elem_type {
        ElemType::Marginal => tei.attr(el, "n").map(|n| strip(&n)).unwrap_or_default(),
        ElemType::Page => match tei.attr(el, "n") {
            Some(n) => strip(&n),
            None => tei
                .attr(el, "facs")
                .map(|f| f.get(5..).unwrap_or_default().to_string())
                .unwrap_or_default(),
        },
        _ if tei.is(el, "item") => {
            // a term key at the same list depth gives the item a speaking name
            let item_depth = tei.ancestors(el).filter(|a| tei.is(*a, "list")).count();
            tei.proper_descendants(el)
                .filter(|d| tei.is(*d, "term") && tei.attr(*d, "key").is_some())
                .find(|d| {
                    tei.ancestors(*d).filter(|a| tei.is(*a, "list")).count() == item_depth
                })
                .and_then(|d| tei.attr(d, "key"))
                .map(|key| strip(&key))
                .unwrap_or_default()
        }
        _ => String::new(),
    }
}

/// The citetrail parent of a node, depending on its role.
fn citable_parent(tei: &Tei, el: xot::Node, elem_type: ElemType) -> Option<String> {
    match elem_type {
        // marginals and anchors must not have running-text blocks as parents
        ElemType::Marginal | ElemType::Anchor => tei
            .ancestors(el)
            .find(|a| classify::is_structural_elem(tei, *a))
            .and_then(|a| tei.xml_id(a)),
        // pages are numbered within front, back, or a volume, avoiding
        // collisions with identically named pages elsewhere
        ElemType::Page => tei
            .ancestors(el)
            .find(|a| {
                tei.is(*a, "front")
                    || tei.is(*a, "back")
                    || (tei.is(*a, "text")
                        && tei.xml_id(*a).as_deref() != Some("completeWork")
                        && tei.attr(*a, "type").as_deref() != Some("work_part"))
            })
            .and_then(|a| tei.xml_id(a)),
        _ => tei
            .ancestors(el)
            .find(|a| classify::elem_type(tei, *a).is_some())
            .and_then(|a| tei.xml_id(a)),
    }
}

/// Semantic label of a node ("chapter", "page", "paragraph", …).
fn cite_type(tei: &Tei, el: xot::Node, elem_type: ElemType) -> String {
    match elem_type {
        ElemType::Page => "page".to_string(),
        ElemType::Marginal => "note".to_string(),
        ElemType::Anchor => tei.attr(el, "unit").unwrap_or_default(),
        ElemType::Structural => {
            if tei.is(el, "front") {
                "frontmatter".to_string()
            } else if tei.is(el, "back") {
                "backmatter".to_string()
            } else if tei.is(el, "text") {
                "volume".to_string()
            } else {
                tei.attr(el, "type").unwrap_or_default()
            }
        }
        ElemType::Main => match tei.local_name(el).unwrap_or_default() {
            "p" => "paragraph".to_string(),
            "head" => "heading".to_string(),
            "titlePage" => "titlepage".to_string(),
            "lg" => "poem".to_string(),
            other => other.to_string(),
        },
        ElemType::List => match tei.local_name(el).unwrap_or_default() {
            "list" => tei.attr(el, "type").unwrap_or_else(|| "list".to_string()),
            "head" => "heading".to_string(),
            other => other.to_string(),
        },
    }
}

/// Whether a node contributes a passagetrail fragment.
pub(crate) fn is_citeref(tei: &Tei, el: xot::Node) -> bool {
    if classify::is_marginal_elem(tei, el) || classify::is_page_elem(tei, el) {
        return true;
    }
    if tei.is(el, "text") && tei.attr(el, "type").as_deref() == Some("work_volume") {
        return true;
    }
    let key = if tei.is(el, "div") {
        tei.attr(el, "type")
    } else if tei.is(el, "milestone") {
        tei.attr(el, "unit")
    } else {
        tei.local_name(el).map(str::to_string)
    };
    key.and_then(|k| citation_label(&k))
        .is_some_and(|l| l.cite_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tei::Tei;

    fn setup(body: &str) -> (Tei, WorkConfig) {
        let source = format!(
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader><encodingDesc><charDecl>
    <char xml:id="char017f"><mapping type="standardized">s</mapping></char>
  </charDecl></encodingDesc></teiHeader>
  <text xml:id="completeWork">{body}</text>
</TEI>"#
        );
        let tei = Tei::parse(&source).unwrap();
        let mut cfg = WorkConfig::new("W0001", "https://id.example", "https://img.example");
        cfg.read_header(&tei).unwrap();
        (tei, cfg)
    }

    #[test]
    fn non_citable_elements_are_hoisted() {
        let (tei, mut cfg) = setup(
            r#"<body>
  <div type="chapter" xml:id="c1">
    <head xml:id="h1">Caput primum</head>
    <p xml:id="p1">Text</p>
  </div>
</body>"#,
        );
        let index = build_index(&tei, &mut cfg).unwrap();
        // body is transparent: c1 sits directly below the sentinel root
        let c1 = index.tree.root().children().next().unwrap();
        assert_eq!(c1.value().id, "c1");
        let kids: Vec<_> = c1.children().map(|n| n.value().id.clone()).collect();
        assert_eq!(kids, vec!["h1", "p1"]);
    }

    #[test]
    fn stems_and_parents_follow_the_rules() {
        let (tei, mut cfg) = setup(
            r#"<front xml:id="f1">
  <titlePage xml:id="tp1"><titlePart xml:id="tpp1">T</titlePart></titlePage>
  <pb xml:id="pb1" n="5" facs="facs:W0001-0005"/>
  <pb xml:id="pb2" facs="facs:W0001-0006"/>
</front>
<body>
  <div type="chapter" n="2" xml:id="c1">
    <p xml:id="p1">Text<note place="margin" n="a*" xml:id="n1">N</note>
      <milestone unit="article" n="3" xml:id="m1"/>
    </p>
  </div>
</body>"#,
        );
        let index = build_index(&tei, &mut cfg).unwrap();
        let stem = |id: &str| index.by_id(id).unwrap().value().cite_stem.clone();
        assert_eq!(stem("f1"), "frontmatter");
        assert_eq!(stem("tp1"), "titlepage");
        assert_eq!(stem("pb1"), "p5");
        // a page without @n falls back to @facs minus its scheme prefix
        assert_eq!(stem("pb2"), "pW0001-0006");
        assert_eq!(stem("n1"), "nA");
        assert_eq!(stem("m1"), "article");
        assert_eq!(stem("c1"), "cap.");

        let parent = |id: &str| index.by_id(id).unwrap().value().citetrail_parent.clone();
        // marginals and anchors attach to the nearest structural ancestor
        assert_eq!(parent("n1").as_deref(), Some("c1"));
        assert_eq!(parent("m1").as_deref(), Some("c1"));
        // pages attach to front even when nested deeper
        assert_eq!(parent("pb1").as_deref(), Some("f1"));
        assert_eq!(parent("p1").as_deref(), Some("c1"));
        // the completeWork text never becomes a page parent
        assert_eq!(parent("f1"), None);
    }

    #[test]
    fn levels_count_citetrail_ancestors() {
        let (tei, mut cfg) = setup(
            r#"<body>
  <div type="book" n="1" xml:id="b1">
    <div type="chapter" n="1" xml:id="c1"><p xml:id="p1">x</p></div>
  </div>
</body>"#,
        );
        let index = build_index(&tei, &mut cfg).unwrap();
        assert_eq!(index.by_id("b1").unwrap().value().level, 1);
        assert_eq!(index.by_id("c1").unwrap().value().level, 2);
        assert_eq!(index.by_id("p1").unwrap().value().level, 3);
        assert_eq!(cfg.cite_depth(), 3);
    }

    #[test]
    fn passage_stems_only_for_citeref_nodes() {
        let (tei, mut cfg) = setup(
            r#"<body>
  <div type="chapter" n="2" xml:id="c1">
    <head xml:id="h1">Caput</head>
    <p xml:id="p1">Text<milestone unit="article" n="3" xml:id="m1"/></p>
  </div>
</body>"#,
        );
        let index = build_index(&tei, &mut cfg).unwrap();
        let stem = |id: &str| index.by_id(id).unwrap().value().passage_stem.clone();
        assert_eq!(stem("c1").as_deref(), Some("cap. 2"));
        assert_eq!(stem("m1").as_deref(), Some("art. 3"));
        assert_eq!(stem("h1"), None); // heads carry no citation label
        assert_eq!(stem("p1").as_deref(), Some("paragr."));
        let m1 = index.by_id("m1").unwrap();
        // anchors concatenate below their structural ancestor, skipping the
        // enclosing paragraph
        assert_eq!(m1.value().passage_parent.as_deref(), Some("c1"));
        assert_eq!(m1.value().passage_ancestors, 2);
    }

    #[test]
    fn titles_prefer_speaking_attributes() {
        let (tei, mut cfg) = setup(
            r#"<body>
  <div type="chapter" n="De legibus" xml:id="c1">
    <head xml:id="h1">Caput primum de legibus ac de aliis rebus quae hic non memorantur</head>
    <p xml:id="p1">Short text</p>
    <pb xml:id="pb1" n="fol. 3r" facs="facs:W0001-0007"/>
  </div>
</body>"#,
        );
        let index = build_index(&tei, &mut cfg).unwrap();
        let title = |id: &str| index.by_id(id).unwrap().value().title.clone();
        assert_eq!(title("c1"), "\"De legibus\"");
        assert_eq!(title("p1"), "\"Short text\"");
        assert_eq!(title("pb1"), "fol. 3r");
        let head_title = title("h1");
        assert!(head_title.starts_with("\"Caput primum"));
        assert!(head_title.ends_with("…\""));
    }

    #[test]
    fn duplicate_ids_are_an_indexing_error() {
        let (tei, mut cfg) = setup(
            r#"<body>
  <div type="chapter" xml:id="c1"><p xml:id="c1">x</p></div>
</body>"#,
        );
        assert!(matches!(
            build_index(&tei, &mut cfg),
            Err(Error::NodeIndexing(_))
        ));
    }

    #[test]
    fn dict_list_items_become_entries() {
        let (tei, mut cfg) = setup(
            r#"<body>
  <div type="index" xml:id="d1">
    <list type="dict" xml:id="l1">
      <item xml:id="i1"><term key="Lex">Lex</term> is the law</item>
    </list>
  </div>
</body>"#,
        );
        let index = build_index(&tei, &mut cfg).unwrap();
        let i1 = index.by_id("i1").unwrap();
        assert_eq!(i1.value().cite_stem, "entryLEX");
        assert_eq!(i1.value().list_level, Some(1));
        assert_eq!(i1.value().list_parent.as_deref(), Some("l1"));
    }
}
