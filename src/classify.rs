//! Element classification.
//!
//! Pure predicates over an element's tag, attributes, and ancestor or
//! descendant axes. Every element is assigned at most one role; the order
//! of the checks in [`elem_type`] makes the classification exclusive.

use crate::tei::Tei;

/// The role an indexable element plays in the citation hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemType {
    /// Interior of the hierarchy; only a teaser of its content is rendered.
    Structural,
    /// Running-text block in the main text column.
    Main,
    /// Marginal note or label.
    Marginal,
    /// Page break.
    Page,
    /// Milestone anchor inside running text.
    Anchor,
    /// List, item, or list-scoped head/argument.
    List,
}

impl ElemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElemType::Structural => "structural",
            ElemType::Main => "main",
            ElemType::Marginal => "marginal",
            ElemType::Page => "page",
            ElemType::Anchor => "anchor",
            ElemType::List => "list",
        }
    }
}

/// Attribute equals test that is false when the attribute is absent.
fn attr_is(tei: &Tei, node: xot::Node, name: &str, value: &str) -> bool {
    tei.attr(node, name).as_deref() == Some(value)
}

/// Attribute present and different from `value` (XPath `@a != "v"`).
fn attr_differs(tei: &Tei, node: xot::Node, name: &str, value: &str) -> bool {
    matches!(tei.attr(node, name).as_deref(), Some(v) if v != value)
}

fn has_list_ancestor(tei: &Tei, node: xot::Node) -> bool {
    tei.ancestors(node).any(|a| tei.is(a, "list"))
}

fn is_structural_self(tei: &Tei, node: xot::Node) -> bool {
    (tei.is(node, "div") && attr_differs(tei, node, "type", "work_part"))
        || tei.is(node, "back")
        || tei.is(node, "front")
        || (tei.is(node, "text") && attr_is(tei, node, "type", "work_volume"))
}

fn is_main_self(tei: &Tei, node: xot::Node) -> bool {
    tei.is(node, "p")
        || tei.is(node, "signed")
        || (tei.is(node, "head") && !has_list_ancestor(tei, node))
        || tei.is(node, "titlePage")
        || tei.is(node, "lg")
        || (tei.is(node, "label") && attr_differs(tei, node, "place", "margin"))
        || (tei.is(node, "argument") && !has_list_ancestor(tei, node))
        || tei.is(node, "table")
}

fn is_marginal_self(tei: &Tei, node: xot::Node) -> bool {
    (tei.is(node, "note") && attr_is(tei, node, "place", "margin"))
        || (tei.is(node, "label") && attr_is(tei, node, "place", "margin"))
}

fn is_page_self(tei: &Tei, node: xot::Node) -> bool {
    tei.is(node, "pb")
        && tei.attr(node, "sameAs").is_none()
        && tei.attr(node, "corresp").is_none()
}

fn is_anchor_self(tei: &Tei, node: xot::Node) -> bool {
    tei.is(node, "milestone") && attr_differs(tei, node, "unit", "other")
}

fn is_list_self(tei: &Tei, node: xot::Node) -> bool {
    tei.is(node, "list")
        || tei.is(node, "item")
        || (tei.is(node, "head") && has_list_ancestor(tei, node))
        || (tei.is(node, "argument") && has_list_ancestor(tei, node))
}

pub fn is_structural_elem(tei: &Tei, node: xot::Node) -> bool {
    is_structural_self(tei, node)
}

/// Main elements must not be nested inside other main, marginal, or list
/// elements.
pub fn is_main_elem(tei: &Tei, node: xot::Node) -> bool {
    is_main_self(tei, node)
        && !tei.ancestors(node).any(|a| {
            is_main_self(tei, a) || is_marginal_self(tei, a) || is_list_self(tei, a)
        })
}

pub fn is_marginal_elem(tei: &Tei, node: xot::Node) -> bool {
    is_marginal_self(tei, node)
}

pub fn is_page_elem(tei: &Tei, node: xot::Node) -> bool {
    is_page_self(tei, node)
}

pub fn is_anchor_elem(tei: &Tei, node: xot::Node) -> bool {
    is_anchor_self(tei, node)
}

/// List elements must not be nested inside main or marginal elements.
pub fn is_list_elem(tei: &Tei, node: xot::Node) -> bool {
    is_list_self(tei, node)
        && !tei
            .ancestors(node)
            .any(|a| is_main_self(tei, a) || is_marginal_self(tei, a))
}

/// Determines the role of an indexable element; `None` if it is not
/// indexable. First match wins.
pub fn elem_type(tei: &Tei, node: xot::Node) -> Option<ElemType> {
    if is_structural_elem(tei, node) {
        Some(ElemType::Structural)
    } else if is_main_elem(tei, node) {
        Some(ElemType::Main)
    } else if is_marginal_elem(tei, node) {
        Some(ElemType::Marginal)
    } else if is_page_elem(tei, node) {
        Some(ElemType::Page)
    } else if is_anchor_elem(tei, node) {
        Some(ElemType::Anchor)
    } else if is_list_elem(tei, node) {
        Some(ElemType::List)
    } else {
        None
    }
}

/// Lowest-level list constituent: an item, head, or argument that contains
/// no further list.
fn is_leaf_list_self(tei: &Tei, node: xot::Node) -> bool {
    (tei.is(node, "item") || tei.is(node, "head") || tei.is(node, "argument"))
        && !tei.proper_descendants(node).any(|d| tei.is(d, "list"))
}

/// A list element whose content is rendered in full: the lowest list level,
/// not wrapped in another leaf.
pub fn is_basic_list_elem(tei: &Tei, node: xot::Node) -> bool {
    is_list_elem(tei, node)
        && is_leaf_list_self(tei, node)
        && !tei.ancestors(node).any(|a| is_leaf_list_self(tei, a))
}

/// A leaf-citable node whose content is rendered in full.
pub fn is_basic_elem(tei: &Tei, node: xot::Node) -> bool {
    is_main_elem(tei, node) || is_marginal_elem(tei, node) || is_basic_list_elem(tei, node)
}

/// True if any ancestor is a basic node; recursive rendering stops once a
/// leaf fragment boundary has been crossed.
pub fn has_basic_ancestor(tei: &Tei, node: xot::Node) -> bool {
    tei.ancestors(node).any(|a| is_basic_elem(tei, a))
}

/// The `@type` of the nearest list, looking at the element itself first.
pub fn get_list_type(tei: &Tei, node: xot::Node) -> Option<String> {
    if tei.is(node, "list") {
        if let Some(t) = tei.attr(node, "type") {
            return Some(t);
        }
    }
    tei.ancestors(node)
        .filter(|a| tei.is(*a, "list"))
        .find_map(|a| tei.attr(a, "type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tei::Tei;

    fn sample() -> Tei {
        Tei::parse(
            r##"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader/>
  <text xml:id="complete">
    <front xml:id="front1">
      <titlePage xml:id="tp1"><titlePart xml:id="tpp1">Title</titlePart></titlePage>
      <pb xml:id="pb1" n="1" facs="facs:W0001-0001"/>
    </front>
    <body xml:id="body1">
      <div type="chapter" xml:id="c1">
        <head xml:id="h1">Caput</head>
        <p xml:id="p1">Text <note place="margin" xml:id="n1">Nota <hi xml:id="hi1">x</hi></note>
          <milestone unit="article" n="1" xml:id="m1"/>
        </p>
        <div type="work_part" xml:id="wp1"/>
        <list type="index" xml:id="l1">
          <head xml:id="lh1">Index</head>
          <item xml:id="i1">One</item>
          <item xml:id="i2"><list xml:id="l2"><item xml:id="i3">Deep</item></list></item>
        </list>
        <pb xml:id="pb2" sameAs="#pb1"/>
      </div>
    </body>
  </text>
</TEI>"##,
        )
        .unwrap()
    }

    #[test]
    fn roles_follow_the_table() {
        let tei = sample();
        let ty = |id: &str| elem_type(&tei, tei.node_by_id(id).unwrap());
        assert_eq!(ty("c1"), Some(ElemType::Structural));
        assert_eq!(ty("front1"), Some(ElemType::Structural));
        assert_eq!(ty("wp1"), None); // work_part divs are not indexable
        assert_eq!(ty("h1"), Some(ElemType::Main));
        assert_eq!(ty("p1"), Some(ElemType::Main));
        assert_eq!(ty("tp1"), Some(ElemType::Main));
        assert_eq!(ty("n1"), Some(ElemType::Marginal));
        assert_eq!(ty("pb1"), Some(ElemType::Page));
        assert_eq!(ty("pb2"), None); // @sameAs excludes the page
        assert_eq!(ty("m1"), Some(ElemType::Anchor));
        assert_eq!(ty("l1"), Some(ElemType::List));
        assert_eq!(ty("i1"), Some(ElemType::List));
        assert_eq!(ty("lh1"), Some(ElemType::List));
        assert_eq!(ty("body1"), None);
        assert_eq!(ty("hi1"), None);
    }

    #[test]
    fn classification_is_exclusive() {
        let tei = sample();
        let root = tei.document_element().unwrap();
        for node in tei.descendants(root) {
            let mut roles = 0;
            if is_structural_elem(&tei, node) {
                roles += 1;
            }
            if is_main_elem(&tei, node) {
                roles += 1;
            }
            if is_marginal_elem(&tei, node) {
                roles += 1;
            }
            if is_page_elem(&tei, node) {
                roles += 1;
            }
            if is_anchor_elem(&tei, node) {
                roles += 1;
            }
            if is_list_elem(&tei, node) {
                roles += 1;
            }
            assert!(roles <= 1, "more than one role for a node");
        }
    }

    #[test]
    fn basic_nodes_are_leaves() {
        let tei = sample();
        let basic = |id: &str| is_basic_elem(&tei, tei.node_by_id(id).unwrap());
        assert!(basic("p1"));
        assert!(basic("n1"));
        assert!(basic("i1"));
        assert!(basic("i3")); // innermost item of the nested list
        assert!(!basic("i2")); // contains a list
        assert!(!basic("l1"));
        assert!(!basic("c1"));
        assert!(has_basic_ancestor(&tei, tei.node_by_id("hi1").unwrap()));
        assert!(!has_basic_ancestor(&tei, tei.node_by_id("p1").unwrap()));
    }

    #[test]
    fn list_type_comes_from_the_nearest_list() {
        let tei = sample();
        let i1 = tei.node_by_id("i1").unwrap();
        assert_eq!(get_list_type(&tei, i1).as_deref(), Some("index"));
        let i3 = tei.node_by_id("i3").unwrap();
        // the inner list has no @type; the nearest typed ancestor wins
        assert_eq!(get_list_type(&tei, i3).as_deref(), Some("index"));
    }
}
