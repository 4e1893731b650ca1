//! Identifier resolution.
//!
//! The second pass over the preliminary index: disambiguates sibling stems,
//! concatenates parent citetrails and passagetrails, and assigns positions
//! and sibling/member links. Traversal is strictly document order, so a
//! parent's full citetrail is always on record before its children ask for
//! it. Running the resolver twice is a no-op.

use std::collections::HashMap;

use ego_tree::{NodeId, NodeRef};
use itertools::Itertools;

use crate::classify::ElemType;
use crate::config::WorkConfig;
use crate::index::{IndexNode, WorkIndex};
use crate::Result;

/// Resolves the preliminary index in place.
pub fn resolve_index(index: &mut WorkIndex, cfg: &mut WorkConfig) -> Result<()> {
    let ids: Vec<NodeId> = index
        .tree
        .root()
        .descendants()
        .skip(1)
        .map(|n| n.id())
        .collect();

    resolve_citetrails(index, cfg, &ids);
    resolve_passagetrails(index, cfg, &ids);
    resolve_links(index, &ids);
    Ok(())
}

fn resolve_citetrails(index: &mut WorkIndex, cfg: &mut WorkConfig, ids: &[NodeId]) {
    for &nid in ids {
        let node = index.tree.get(nid).expect("node id from this tree");
        let fragment = citetrail_fragment(&node);
        let value = node.value();
        let full = match value
            .citetrail_parent
            .as_deref()
            .and_then(|pid| cfg.citetrail(pid))
        {
            // traversal order guarantees the parent is already resolved
            Some(parent_trail) => format!("{parent_trail}.{fragment}"),
            None => fragment,
        };
        let id = value.id.clone();
        cfg.observe_level(value.level);
        index
            .tree
            .get_mut(nid)
            .expect("node id from this tree")
            .value()
            .citetrail = Some(full.clone());
        cfg.put_citetrail(&id, &full);
    }
}

/// The disambiguated citetrail fragment of one node.
///
/// Position suffixes are assigned in document order among index siblings
/// with the identical stem. Stems ending in a digit keep a `-` before the
/// number so page numbers stay readable; label-abbreviation stems ending in
/// a dot are always numbered, their dot doubling as the separator.
fn citetrail_fragment(node: &NodeRef<'_, IndexNode>) -> String {
    let stem = &node.value().cite_stem;
    if stem.is_empty() {
        let unnamed_before = node
            .prev_siblings()
            .filter(|s| s.value().cite_stem.is_empty())
            .count();
        return (unnamed_before + 1).to_string();
    }
    let before = node
        .prev_siblings()
        .filter(|s| &s.value().cite_stem == stem)
        .count();
    let after = node
        .next_siblings()
        .filter(|s| &s.value().cite_stem == stem)
        .count();
    if stem.ends_with(|c: char| c.is_ascii_digit()) {
        if before + after > 0 {
            format!("{stem}-{}", before + 1)
        } else {
            stem.clone()
        }
    } else if stem.ends_with('.') {
        format!("{stem}{}", before + 1)
    } else if before + after > 0 {
        format!("{stem}{}", before + 1)
    } else {
        stem.clone()
    }
}

fn resolve_passagetrails(index: &mut WorkIndex, cfg: &mut WorkConfig, ids: &[NodeId]) {
    for &nid in ids {
        let node = index.tree.get(nid).expect("node id from this tree");
        let value = node.value();
        let fragment = match value.passage_stem.as_deref() {
            Some(stem) => passage_fragment(index, ids, nid, stem),
            None => String::new(),
        };
        let parent_trail = value
            .passage_parent
            .as_deref()
            .and_then(|pid| cfg.passagetrail(pid))
            .unwrap_or_default()
            .to_string();
        let full = match (parent_trail.is_empty(), fragment.is_empty()) {
            (true, _) => fragment,
            (false, true) => parent_trail,
            (false, false) => format!("{parent_trail}, {fragment}"),
        };
        let id = value.id.clone();
        index
            .tree
            .get_mut(nid)
            .expect("node id from this tree")
            .value()
            .passagetrail = Some(full.clone());
        cfg.put_passagetrail(&id, &full);
    }
}

/// Disambiguates a passage fragment among its peers: nodes with the same
/// stem, tag, and passagetrail-ancestor count below the same passagetrail
/// parent are numbered in document order with a bracketed position.
fn passage_fragment(index: &WorkIndex, ids: &[NodeId], nid: NodeId, stem: &str) -> String {
    let value = index.tree.get(nid).expect("node id from this tree").value();
    let peers: Vec<NodeId> = ids
        .iter()
        .copied()
        .filter(|oid| {
            let other = index.tree.get(*oid).expect("node id from this tree").value();
            other.passage_parent == value.passage_parent
                && other.name == value.name
                && other.passage_ancestors == value.passage_ancestors
                && other.passage_stem.as_deref() == Some(stem)
        })
        .collect();
    if peers.len() > 1 {
        let position = peers
            .iter()
            .position(|oid| *oid == nid)
            .expect("node is among its peers")
            + 1;
        format!("{stem} [{position}]")
    } else {
        stem.to_string()
    }
}

fn resolve_links(index: &mut WorkIndex, ids: &[NodeId]) {
    // members: every node naming N as its citetrail parent, in document order
    let mut members: HashMap<String, Vec<String>> = ids
        .iter()
        .filter_map(|&nid| {
            let value = index.tree.get(nid)?.value();
            let parent = value.citetrail_parent.clone()?;
            Some((parent, value.id.clone()))
        })
        .into_group_map();

    for (position, &nid) in ids.iter().enumerate() {
        let node = index.tree.get(nid).expect("node id from this tree");
        let value = node.value();
        let (prev, next) = match value.elem_type {
            ElemType::Structural | ElemType::Main => {
                let ty = value.elem_type;
                let prev = node
                    .prev_siblings()
                    .find(|s| s.value().elem_type == ty)
                    .map(|s| s.value().id.clone());
                let next = node
                    .next_siblings()
                    .find(|s| s.value().elem_type == ty)
                    .map(|s| s.value().id.clone());
                (prev, next)
            }
            _ => (None, None),
        };
        let node_members = members.remove(&value.id).unwrap_or_default();
        let mut node = index.tree.get_mut(nid).expect("node id from this tree");
        let value = node.value();
        value.position = Some(position + 1);
        value.prev = prev;
        value.next = next;
        value.members = node_members;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkConfig;
    use crate::index::build_index;
    use crate::tei::Tei;

    fn resolved(body: &str) -> (WorkIndex, WorkConfig) {
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
        let mut index = build_index(&tei, &mut cfg).unwrap();
        resolve_index(&mut index, &mut cfg).unwrap();
        (index, cfg)
    }

    fn citetrail(index: &WorkIndex, id: &str) -> String {
        index.by_id(id).unwrap().value().citetrail.clone().unwrap()
    }

    #[test]
    fn chapter_paragraph_citetrails() {
        let (index, cfg) = resolved(
            r#"<body><div type="chapter" xml:id="c1"><p xml:id="p1">Hello</p></div></body>"#,
        );
        assert_eq!(citetrail(&index, "c1"), "cap.1");
        assert_eq!(citetrail(&index, "p1"), "cap.1.1");
        assert_eq!(cfg.citetrail("p1"), Some("cap.1.1"));
    }

    #[test]
    fn identical_page_stems_get_dash_suffixes() {
        let (index, _) = resolved(
            r#"<front xml:id="f1">
  <pb xml:id="pba" n="5" facs="facs:W0001-0005"/>
  <pb xml:id="pbb" n="5" facs="facs:W0001-0006"/>
</front><body><div type="chapter" xml:id="c1"><p xml:id="p1">x</p></div></body>"#,
        );
        assert_eq!(citetrail(&index, "pba"), "frontmatter.p5-1");
        assert_eq!(citetrail(&index, "pbb"), "frontmatter.p5-2");
    }

    #[test]
    fn empty_stems_count_unnamed_siblings() {
        let (index, _) = resolved(
            r#"<body><div type="chapter" xml:id="c1">
  <p xml:id="p1">a</p>
  <p xml:id="p2">b</p>
</div></body>"#,
        );
        assert_eq!(citetrail(&index, "p1"), "cap.1.1");
        assert_eq!(citetrail(&index, "p2"), "cap.1.2");
    }

    #[test]
    fn citetrails_are_unique() {
        let (index, _) = resolved(
            r#"<front xml:id="f1"><pb xml:id="pba" n="5" facs="facs:W0001-0005"/>
<pb xml:id="pbb" n="5" facs="facs:W0001-0006"/></front>
<body>
  <div type="chapter" xml:id="c1"><head xml:id="h1">One</head><p xml:id="p1">a</p><p xml:id="p2">b</p></div>
  <div type="chapter" xml:id="c2"><p xml:id="p3">c</p>
    <milestone unit="article" n="1" xml:id="m1"/>
    <note place="margin" xml:id="n1">note</note>
  </div>
</body>"#,
        );
        let mut trails: Vec<String> = index
            .nodes()
            .map(|n| n.value().citetrail.clone().unwrap())
            .collect();
        let total = trails.len();
        trails.sort();
        trails.dedup();
        assert_eq!(trails.len(), total, "citetrails must be pairwise unique");
    }

    #[test]
    fn milestone_passagetrail_concatenates_below_the_chapter() {
        let (index, _) = resolved(
            r#"<body><div type="chapter" n="2" xml:id="c1">
  <p xml:id="p1">x<milestone unit="article" n="3" xml:id="m1"/></p>
</div></body>"#,
        );
        let m1 = index.by_id("m1").unwrap();
        assert_eq!(m1.value().passagetrail.as_deref(), Some("cap. 2, art. 3"));
    }

    #[test]
    fn equal_passage_stems_get_bracketed_positions() {
        let (index, _) = resolved(
            r#"<body><div type="chapter" n="2" xml:id="c1">
  <p xml:id="p1">a</p>
  <p xml:id="p2">b</p>
</div></body>"#,
        );
        let trail = |id: &str| {
            index
                .by_id(id)
                .unwrap()
                .value()
                .passagetrail
                .clone()
                .unwrap()
        };
        assert_eq!(trail("p1"), "cap. 2, paragr. [1]");
        assert_eq!(trail("p2"), "cap. 2, paragr. [2]");
    }

    #[test]
    fn prev_next_link_same_type_siblings() {
        let (index, _) = resolved(
            r#"<body>
  <div type="chapter" xml:id="c1"><p xml:id="p1">a</p></div>
  <div type="chapter" xml:id="c2"><p xml:id="p2">b</p></div>
  <div type="chapter" xml:id="c3"><p xml:id="p3">c</p></div>
</body>"#,
        );
        let c2 = index.by_id("c2").unwrap();
        assert_eq!(c2.value().prev.as_deref(), Some("c1"));
        assert_eq!(c2.value().next.as_deref(), Some("c3"));
        let c1 = index.by_id("c1").unwrap();
        assert_eq!(c1.value().prev, None);
        assert_eq!(c1.value().next.as_deref(), Some("c2"));
        // paragraphs have no same-type siblings across chapters
        let p1 = index.by_id("p1").unwrap();
        assert_eq!(p1.value().next, None);
    }

    #[test]
    fn members_name_the_citetrail_parent() {
        let (index, _) = resolved(
            r#"<body><div type="chapter" xml:id="c1">
  <list type="numbered" xml:id="l1"><item xml:id="i1">A</item><item xml:id="i2">B</item></list>
</div></body>"#,
        );
        let l1 = index.by_id("l1").unwrap();
        assert_eq!(l1.value().members, vec!["i1", "i2"]);
        assert_eq!(citetrail(&index, "i1"), "cap.1.1.1");
        assert_eq!(citetrail(&index, "i2"), "cap.1.1.2");
    }

    #[test]
    fn positions_follow_document_order() {
        let (index, _) = resolved(
            r#"<body><div type="chapter" xml:id="c1"><p xml:id="p1">a</p><p xml:id="p2">b</p></div></body>"#,
        );
        let positions: Vec<usize> = index
            .nodes()
            .map(|n| n.value().position.unwrap())
            .collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn resolving_twice_is_a_noop() {
        let source = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <teiHeader><encodingDesc><charDecl>
    <char xml:id="char017f"><mapping type="standardized">s</mapping></char>
  </charDecl></encodingDesc></teiHeader>
  <text xml:id="completeWork"><body>
    <div type="chapter" xml:id="c1"><p xml:id="p1">a</p><p xml:id="p2">b</p>
      <note place="margin" n="x" xml:id="n1">m</note>
    </div>
  </body></text>
</TEI>"#;
        let tei = Tei::parse(source).unwrap();
        let mut cfg = WorkConfig::new("W0001", "https://id.example", "https://img.example");
        cfg.read_header(&tei).unwrap();
        let mut index = build_index(&tei, &mut cfg).unwrap();
        resolve_index(&mut index, &mut cfg).unwrap();
        let first: Vec<IndexNode> = index.nodes().map(|n| n.value().clone()).collect();
        resolve_index(&mut index, &mut cfg).unwrap();
        let second: Vec<IndexNode> = index.nodes().map(|n| n.value().clone()).collect();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.citetrail, b.citetrail);
            assert_eq!(a.passagetrail, b.passagetrail);
            assert_eq!(a.position, b.position);
            assert_eq!(a.prev, b.prev);
            assert_eq!(a.next, b.next);
            assert_eq!(a.members, b.members);
        }
    }

    #[test]
    fn level_is_one_plus_citetrail_ancestors() {
        let (index, cfg) = resolved(
            r#"<body><div type="book" n="1" xml:id="b1">
  <div type="chapter" n="1" xml:id="c1"><p xml:id="p1">x</p></div>
</div></body>"#,
        );
        for node in index.nodes() {
            let value = node.value();
            let mut ancestors = 0;
            let mut current = value.citetrail_parent.clone();
            while let Some(pid) = current {
                ancestors += 1;
                current = index
                    .by_id(&pid)
                    .and_then(|p| p.value().citetrail_parent.clone());
            }
            assert_eq!(value.level, ancestors + 1);
            assert!(value.level <= cfg.cite_depth());
        }
    }
}
