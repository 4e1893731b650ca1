//! HTML rendering of TEI content.
//!
//! Unlike the plain-text target, editorial variants are not chosen here:
//! both layers are emitted in `orig`/`edit` class spans carrying the
//! counterpart reading as a tooltip, and the stylesheet decides which layer
//! is visible.

use maud::{Markup, PreEscaped, html};

use crate::classify::{
    get_list_type, is_basic_elem, is_basic_list_elem, is_list_elem, is_main_elem,
    is_marginal_elem, is_page_elem, is_structural_elem,
};
use crate::config::{EDIT_CLASS, ORIG_CLASS};
use crate::render::refs::{iiif_image_url, resolve_ref_target};
use crate::render::{Mode, Renderer, TeiKind};
use crate::tei::collapse_whitespace;
use crate::{Error, Result};

/// Containers whose text participates in the alignment-collision check.
const HI_CONTAINERS: &[&str] = &[
    "p", "head", "note", "item", "cell", "label", "signed", "lg", "titlePage",
];

impl Renderer<'_> {
    /// Renders a node to HTML.
    pub fn html(&self, node: xot::Node) -> Result<Markup> {
        if let Some(text) = self.tei.text_value(node) {
            let collapsed = collapse_whitespace(text);
            return Ok(html! { (collapsed) });
        }
        if !self.tei.is_element(node) {
            return Ok(html! {});
        }
        let Some(name) = self.tei.local_name(node) else {
            return Ok(html! {});
        };
        let name = name.to_string();
        match TeiKind::from_name(&name) {
            TeiKind::Abbr | TeiKind::Orig | TeiKind::Sic => self.html_orig_elem(node, &name),
            TeiKind::Expan | TeiKind::Reg | TeiKind::Corr => self.html_edit_elem(node, &name),
            TeiKind::Argument => self.wrap(node, "p", "argument"),
            TeiKind::Bibl => self.wrap(node, "span", "bibl"),
            TeiKind::Byline => self.wrap(node, "span", "tp-p byline"),
            TeiKind::Cb | TeiKind::Lb => {
                let space = self.txt_break(node);
                Ok(html! { (space) })
            }
            TeiKind::Cell => {
                let class = match self.tei.attr(node, "role").as_deref() {
                    Some("label") => "table-label",
                    _ => "",
                };
                let inner = self.html_children(node)?;
                Ok(html! { td class=[non_empty(class)] { (inner) } })
            }
            TeiKind::Choice | TeiKind::Del | TeiKind::Div => {
                if TeiKind::from_name(&name) == TeiKind::Del
                    && self.tei.find_child(node, "supplied").is_none()
                {
                    return Err(Error::markup("no child tei:supplied exists in tei:del"));
                }
                self.html_children(node)
            }
            TeiKind::DocAuthor => self.wrap(node, "span", "name docauthor"),
            TeiKind::DocImprint => self.wrap(node, "span", "tp-p docimprint"),
            TeiKind::Figure => Ok(self.html_figure(node)),
            TeiKind::Foreign => self.html_foreign(node),
            TeiKind::G => self.html_g(node),
            TeiKind::Gap => Ok(self.html_gap(node)),
            TeiKind::Head => self.html_head(node),
            TeiKind::Hi => self.html_hi(node),
            TeiKind::Imprimatur => self.wrap(node, "span", "tp-p imprimatur"),
            TeiKind::Item => self.html_item(node),
            TeiKind::Label => self.html_label(node),
            TeiKind::Lg => self.wrap(node, "div", "poem"),
            TeiKind::Line => {
                let inner = self.html_children(node)?;
                Ok(html! { span class="l" { (inner) } br; })
            }
            TeiKind::List => self.html_list(node),
            TeiKind::Milestone => Ok(self.html_milestone(node)),
            TeiKind::Name => self.html_name(node, &name),
            TeiKind::Note => self.html_marginal(node, "note"),
            TeiKind::P => self.html_p(node),
            TeiKind::Pb => self.html_pb(node),
            TeiKind::Ref => self.html_ref(node),
            TeiKind::Row => {
                let inner = self.html_children(node)?;
                Ok(html! { tr { (inner) } })
            }
            TeiKind::Signed => self.wrap(node, "p", "signed"),
            TeiKind::Supplied => self.wrap(node, "span", "supplied"),
            TeiKind::Table => {
                let inner = self.html_children(node)?;
                Ok(html! { table { (inner) } })
            }
            TeiKind::Term => {
                let inner = self.html_children(node)?;
                let key = self.tei.attr(node, "key");
                Ok(html! { span class="term" title=[key] { (inner) } })
            }
            TeiKind::TitlePage => self.wrap(node, "div", "titlepage"),
            TeiKind::TitlePart => self.wrap(node, "span", "tp-p titlepart"),
            TeiKind::Transparent => self.html_children(node),
            TeiKind::Unknown => Err(Error::UnknownElement(name)),
        }
    }

    /// Pass-through: children in document order, stopping at basic and
    /// structural descendants. Marginals and pages leave inline
    /// placeholders; milestones keep their decorated span.
    pub(crate) fn html_children(&self, node: xot::Node) -> Result<Markup> {
        let mut parts: Vec<Markup> = Vec::new();
        for child in self.tei.children(node) {
            if self.tei.is_element(child) {
                if is_marginal_elem(self.tei, child) {
                    let id = self.tei.xml_id(child);
                    parts.push(html! { span class="note-anchor" id=[id] {} });
                    continue;
                }
                if is_page_elem(self.tei, child) {
                    let id = self.tei.xml_id(child);
                    parts.push(html! { span class="pb" id=[id] {} });
                    continue;
                }
                if is_structural_elem(self.tei, child) || is_basic_elem(self.tei, child) {
                    // rendered as fragments of their own
                    continue;
                }
            }
            parts.push(self.html(child)?);
        }
        Ok(html! { @for part in &parts { (part) } })
    }

    fn wrap(&self, node: xot::Node, elem: &str, class: &str) -> Result<Markup> {
        let inner = self.html_children(node)?;
        Ok(match elem {
            "p" => html! { p class=(class) { (inner) } },
            "div" => html! { div class=(class) { (inner) } },
            _ => html! { span class=(class) { (inner) } },
        })
    }

    /// Original-layer variant of a `tei:choice`, with the edited reading as
    /// tooltip.
    fn html_orig_elem(&self, node: xot::Node, name: &str) -> Result<Markup> {
        match self.choice_counterpart(node, &["expan", "reg", "corr"]) {
            Some(counterpart) => {
                let edit_str = self.txt(counterpart, Mode::Edit)?;
                let class = format!("{ORIG_CLASS} {name}");
                let inner = self.html_children(node)?;
                Ok(html! { span class=(class) title=(edit_str) { (inner) } })
            }
            None => self.html_children(node),
        }
    }

    /// Edit-layer variant of a `tei:choice`, with the original reading as
    /// tooltip.
    fn html_edit_elem(&self, node: xot::Node, name: &str) -> Result<Markup> {
        match self.choice_counterpart(node, &["abbr", "orig", "sic"]) {
            Some(counterpart) => {
                let orig_str = self.txt(counterpart, Mode::Orig)?;
                let class = format!("{EDIT_CLASS} {name}");
                let inner = self.html_children(node)?;
                Ok(html! { span class=(class) title=(orig_str) { (inner) } })
            }
            None => self.html_children(node),
        }
    }

    fn html_figure(&self, node: xot::Node) -> Markup {
        if self.tei.attr(node, "type").as_deref() == Some("ornament") {
            html! { hr class="ornament"; }
        } else {
            html! {}
        }
    }

    fn html_foreign(&self, node: xot::Node) -> Result<Markup> {
        let mut class = "foreign".to_string();
        if let Some(lang) = self.tei.xml_attr(node, "lang") {
            class.push(' ');
            class.push_str(&lang);
        }
        let inner = self.html_children(node)?;
        Ok(html! { span class=(class) { (inner) } })
    }

    /// Special glyphs: emit both layers so the stylesheet can switch
    /// between original and standardized or expanded forms.
    fn html_g(&self, node: xot::Node) -> Result<Markup> {
        let text = self.tei.string_value(node);
        if text.is_empty() {
            return Err(Error::markup("tei:g does not contain text"));
        }
        let glyph = self.glyph_of(node)?;
        let code = self.glyph_code(node).unwrap_or_default();
        let orig_glyph = glyph
            .original()
            .or(glyph.standardized.as_deref())
            .ok_or_else(|| Error::markup("glyph declares no mapping"))?
            .to_string();

        // inside a choice the expansion is handled by the choice itself
        if self.tei.ancestors(node).any(|a| self.tei.is(a, "choice")) {
            return Ok(html! { (orig_glyph) });
        }
        let long_glyph = matches!(code.as_str(), "char017f" | "char0292");
        if !glyph.matches_original(&text) && !long_glyph {
            // ad-hoc editorial expansion: the element text is the resolved
            // reading, the glyph the original one
            let orig_class = format!("{ORIG_CLASS} glyph hidden");
            let edit_class = format!("{EDIT_CLASS} glyph");
            return Ok(html! {
                span class=(orig_class) title=(text) { (orig_glyph) }
                span class=(edit_class) title=(orig_glyph) { (text) }
            });
        }
        if long_glyph {
            let standardized = glyph
                .standardized
                .clone()
                .ok_or_else(|| Error::markup("glyph declares no standardized form"))?;
            let orig_class = format!("{ORIG_CLASS} glyph hidden simple");
            let edit_class = format!("{EDIT_CLASS} glyph simple");
            return Ok(html! {
                span class=(orig_class) title=(standardized) { (orig_glyph) }
                span class=(edit_class) title=(orig_glyph) { (standardized) }
            });
        }
        self.html_children(node)
    }

    fn html_gap(&self, node: xot::Node) -> Markup {
        if self.tei.ancestors(node).any(|a| self.tei.is(a, "damage")) {
            html! { span class="gap" title="?" {} }
        } else {
            html! {}
        }
    }

    fn html_head(&self, node: xot::Node) -> Result<Markup> {
        let inner = self.html_children(node)?;
        if is_list_elem(self.tei, node) {
            Ok(html! { li class="head" { (inner) } })
        } else if is_main_elem(self.tei, node) {
            Ok(html! { h3 class="main-head" { (inner) } })
        } else if self.tei.parent(node).is_some_and(|p| self.tei.is(p, "lg")) {
            Ok(html! { h5 class="poem-head" { (inner) } })
        } else {
            Err(Error::markup("unknown context of tei:head"))
        }
    }

    /// `@rendition` styling. Alignment tokens are dropped where an
    /// enclosing section or conflicting sibling text overrides them.
    fn html_hi(&self, node: xot::Node) -> Result<Markup> {
        let rendition = self.tei.attr(node, "rendition").unwrap_or_default();
        let mut classes: Vec<&str> = Vec::new();
        for token in rendition.split_whitespace() {
            match token {
                "#b" => classes.push("hi-b"),
                "#initCaps" => classes.push("hi-initcaps"),
                "#it" => classes.push("hi-it"),
                "#rt" => classes.push("hi-rt"),
                "#l-indent" => classes.push("hi-l-indent"),
                "#r-center" => {
                    if !self.hi_in_alignment_section(node) && !self.hi_is_outlier(node) {
                        classes.push("hi-r-center");
                    }
                }
                "#right" => {
                    if !self.hi_in_alignment_section(node)
                        && !self.tei.ancestors(node).any(|a| self.tei.is(a, "item"))
                    {
                        classes.push("hi-right");
                    }
                }
                "#sc" => classes.push("hi-sc"),
                "#spc" => classes.push("hi-spc"),
                "#sub" => classes.push("hi-sub"),
                "#sup" => classes.push("hi-sup"),
                _ => {}
            }
        }
        let class = classes.join(" ");
        let inner = self.html_children(node)?;
        Ok(html! { span class=(class) { (inner) } })
    }

    /// Heads, signed blocks, title pages, and arguments carry their own
    /// alignment.
    fn hi_in_alignment_section(&self, node: xot::Node) -> bool {
        self.tei.ancestors(node).any(|a| {
            self.tei.is(a, "head")
                || self.tei.is(a, "signed")
                || self.tei.is(a, "titlePage")
                || self.tei.is(a, "argument")
        })
    }

    /// True when the nearest block container holds text outside centered
    /// highlights, so centering this one would break the line.
    fn hi_is_outlier(&self, node: xot::Node) -> bool {
        let Some(container) = self
            .tei
            .ancestors(node)
            .find(|a| HI_CONTAINERS.iter().any(|c| self.tei.is(*a, c)))
        else {
            return false;
        };
        self.tei.text_nodes(container).any(|t| {
            let has_content = self
                .tei
                .text_value(t)
                .is_some_and(|s| !s.trim().is_empty());
            has_content
                && !self.tei.ancestors(t).any(|a| {
                    self.tei.is(a, "hi")
                        && self
                            .tei
                            .attr(a, "rendition")
                            .is_some_and(|r| r.contains("#r-center"))
                })
        })
    }

    fn html_item(&self, node: xot::Node) -> Result<Markup> {
        if !is_basic_list_elem(self.tei, node) {
            return self.html_children(node);
        }
        let inner = self.html_children(node)?;
        match get_list_type(self.tei, node).as_deref() {
            Some("ordered") => {
                let position = self
                    .tei
                    .preceding_siblings(node)
                    .iter()
                    .filter(|s| self.tei.is(**s, "item"))
                    .count()
                    + 1;
                Ok(html! { li class="ordered" value=(position) { (inner) } })
            }
            Some("simple") => Ok(html! { " " span class="li-inline" { (inner) } " " }),
            _ => Ok(html! { li class="unordered" { (inner) } }),
        }
    }

    fn html_label(&self, node: xot::Node) -> Result<Markup> {
        if is_marginal_elem(self.tei, node) {
            self.html_marginal(node, "label")
        } else {
            self.wrap(node, "span", "label")
        }
    }

    /// The rendered block of a marginal note or label.
    fn html_marginal(&self, node: xot::Node, kind: &str) -> Result<Markup> {
        let id = self.tei.xml_id(node);
        let n = self.tei.attr(node, "n");
        let class = format!("marginal {kind}");
        let inner = self.html_children(node)?;
        Ok(html! {
            div class=(class) id=[id] {
                @if let Some(n) = &n { sup class="note-label" { (n) } }
                (inner)
            }
        })
    }

    fn html_list(&self, node: xot::Node) -> Result<Markup> {
        let class = match get_list_type(self.tei, node).as_deref() {
            Some(t) => format!("list {t}"),
            None => "list".to_string(),
        };
        // only the label line of an enclosing list is shown
        let teaser = self
            .tei
            .find_child(node, "head")
            .or_else(|| self.tei.find_child(node, "label"));
        let inner = match teaser {
            Some(teaser) => Some(self.html_children(teaser)?),
            None => None,
        };
        Ok(html! { div class=(class) { @if let Some(inner) = &inner { (inner) } } })
    }

    fn html_milestone(&self, node: xot::Node) -> Markup {
        let id = self.tei.xml_id(node);
        let rendition = self.tei.attr(node, "rendition");
        html! {
            span class="milestone" id=[id] {
                @match rendition.as_deref() {
                    Some("#dagger") => { sup { "†" } }
                    Some("#asterisk") => { "*" }
                    _ => {}
                }
            }
        }
    }

    fn html_name(&self, node: xot::Node, name: &str) -> Result<Markup> {
        let class = format!("name {name}");
        let key = self.tei.attr(node, "key");
        let inner = self.html_children(node)?;
        Ok(html! { span class=(class) title=[key] { (inner) } })
    }

    fn html_p(&self, node: xot::Node) -> Result<Markup> {
        let inner = self.html_children(node)?;
        let context = self.tei.ancestors(node).find_map(|a| {
            if self.tei.is(a, "note") {
                Some("p-note")
            } else if self.tei.is(a, "item") {
                Some("p-item")
            } else if self.tei.is(a, "titlePage") {
                Some("p-titlepage")
            } else {
                None
            }
        });
        Ok(match context {
            Some(class) => html! { span class=(class) { (inner) } },
            None => html! { p class="p" { (inner) } },
        })
    }

    /// The block rendering of a page break: a page link carrying label,
    /// tooltip, and facsimile image URL.
    fn html_pb(&self, node: xot::Node) -> Result<Markup> {
        let id = self.tei.xml_id(node);
        let label = self.page_label(node);
        let image = match self.tei.attr(node, "facs") {
            Some(facs) => Some(iiif_image_url(self.cfg, &facs)?),
            None => None,
        };
        let tooltip = format!("view facsimile of {label}");
        Ok(html! {
            a class="pagebreak" id=[id] href=[image] title=(tooltip) { (label) }
        })
    }

    /// Human-readable page label: `fol. N` for folio numbering, `p. N`
    /// otherwise.
    pub(crate) fn page_label(&self, node: xot::Node) -> String {
        match self.tei.attr(node, "n") {
            Some(n) if n.starts_with("fol.") => n,
            Some(n) => format!("p. {n}"),
            None => self
                .tei
                .attr(node, "facs")
                .map(|f| f.get(5..).unwrap_or_default().to_string())
                .unwrap_or_default(),
        }
    }

    /// Cross references. A ref containing a page break is split into two
    /// anchors bracketing the break.
    fn html_ref(&self, node: xot::Node) -> Result<Markup> {
        let Some(target) = self.tei.attr(node, "target") else {
            return self.html_children(node);
        };
        let resolved = resolve_ref_target(self.cfg, &target)?;
        let children: Vec<xot::Node> = self.tei.children(node).collect();
        let split = children
            .iter()
            .position(|c| self.tei.is_element(*c) && is_page_elem(self.tei, *c));

        let render_run = |run: &[xot::Node]| -> Result<Markup> {
            let mut parts = Vec::new();
            for child in run {
                parts.push(self.html(*child)?);
            }
            Ok(html! { @for part in &parts { (part) } })
        };

        match (resolved, split) {
            (Some(href), Some(at)) => {
                let before = render_run(&children[..at])?;
                let page_id = self.tei.xml_id(children[at]);
                let after = render_run(&children[at + 1..])?;
                Ok(html! {
                    a class="ref" href=(href) { (before) }
                    span class="pb" id=[page_id] {}
                    a class="ref" href=(href) { (after) }
                })
            }
            (Some(href), None) => {
                let inner = render_run(&children)?;
                Ok(html! { a class="ref" href=(href) { (inner) } })
            }
            (None, _) => {
                let inner = self.html_children(node)?;
                Ok(html! { span class="ref" { (inner) } })
            }
        }
    }
}

/// Helper turning an empty class into an absent attribute.
fn non_empty(s: &str) -> Option<PreEscaped<String>> {
    if s.is_empty() {
        None
    } else {
        Some(PreEscaped(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkConfig;
    use crate::render::Renderer;
    use crate::tei::Tei;

    const HEADER: &str = r#"<teiHeader>
    <encodingDesc><charDecl>
      <char xml:id="char017f">
        <mapping type="precomposed">&#383;</mapping>
        <mapping type="standardized">s</mapping>
      </char>
    </charDecl></encodingDesc>
  </teiHeader>"#;

    fn setup(body: &str) -> (Tei, WorkConfig) {
        let source = format!(
            r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">{HEADER}<text xml:id="t"><body>{body}</body></text></TEI>"#
        );
        let tei = Tei::parse(&source).unwrap();
        let mut cfg = WorkConfig::new("W0001", "https://id.example", "https://img.example");
        cfg.read_header(&tei).unwrap();
        (tei, cfg)
    }

    fn render(tei: &Tei, cfg: &WorkConfig, id: &str) -> String {
        let renderer = Renderer::new(tei, cfg);
        let node = tei.node_by_id(id).unwrap();
        renderer.html(node).unwrap().into_string()
    }

    #[test]
    fn choice_emits_both_layers_with_tooltips() {
        let (tei, cfg) =
            setup(r#"<p xml:id="p1"><choice><abbr>wld</abbr><expan>world</expan></choice></p>"#);
        let html = render(&tei, &cfg, "p1");
        assert_eq!(
            html,
            r#"<p class="p"><span class="orig abbr" title="world">wld</span><span class="edit expan" title="wld">world</span></p>"#
        );
    }

    #[test]
    fn long_s_emits_paired_glyph_spans() {
        let (tei, cfg) = setup(r##"<p xml:id="p1"><g ref="#char017f">&#383;</g></p>"##);
        let html = render(&tei, &cfg, "p1");
        assert!(html.contains(r#"<span class="orig glyph hidden simple" title="s">"#));
        assert!(html.contains("<span class=\"edit glyph simple\" title=\"\u{17f}\">s</span>"));
    }

    #[test]
    fn hi_maps_rendition_tokens_to_classes() {
        let (tei, cfg) =
            setup(r##"<p xml:id="p1"><hi rendition="#b #it #sup">x</hi></p>"##);
        let html = render(&tei, &cfg, "p1");
        assert!(html.contains(r#"<span class="hi-b hi-it hi-sup">x</span>"#));
    }

    #[test]
    fn centering_is_suppressed_inside_heads() {
        let (tei, cfg) = setup(
            r##"<div type="chapter" xml:id="d1"><head xml:id="h1"><hi rendition="#r-center">Title</hi></head></div>"##,
        );
        let html = render(&tei, &cfg, "h1");
        assert!(html.contains(r#"<span class="">Title</span>"#));
    }

    #[test]
    fn marginal_children_become_anchors() {
        let (tei, cfg) = setup(
            r#"<p xml:id="p1">body<note place="margin" xml:id="n1">aside</note></p>"#,
        );
        let html = render(&tei, &cfg, "p1");
        assert!(html.contains(r#"<span class="note-anchor" id="n1"></span>"#));
        assert!(!html.contains("aside"));
    }

    #[test]
    fn marginal_note_renders_as_block() {
        let (tei, cfg) = setup(
            r#"<p xml:id="p1"><note place="margin" n="a" xml:id="n1">aside</note></p>"#,
        );
        let html = render(&tei, &cfg, "n1");
        assert_eq!(
            html,
            r#"<div class="marginal note" id="n1"><sup class="note-label">a</sup>aside</div>"#
        );
    }

    #[test]
    fn refs_link_to_citation_uris() {
        let (tei, mut cfg) =
            setup(r##"<p xml:id="p2"><ref target="#p1">see</ref></p>"##);
        cfg.put_citetrail("p1", "cap.1.1");
        let html = render(&tei, &cfg, "p2");
        assert!(html.contains(r#"<a class="ref" href="https://id.example/texts/W0001:cap.1.1">see</a>"#));
    }

    #[test]
    fn ref_with_page_break_is_split() {
        let (tei, mut cfg) = setup(
            r##"<p xml:id="p2"><ref target="#p1">be<pb xml:id="pb9" n="9" facs="facs:W0001-0009"/>fore</ref></p>"##,
        );
        cfg.put_citetrail("p1", "cap.1.1");
        let html = render(&tei, &cfg, "p2");
        let links = html.matches("<a class=\"ref\"").count();
        assert_eq!(links, 2);
        assert!(html.contains(r#"<span class="pb" id="pb9"></span>"#));
    }

    #[test]
    fn page_breaks_render_as_facsimile_links() {
        let (tei, cfg) = setup(r#"<pb xml:id="pb5" n="5" facs="facs:W0001-0005"/>"#);
        let html = render(&tei, &cfg, "pb5");
        assert_eq!(
            html,
            r#"<a class="pagebreak" id="pb5" href="https://img.example/iiif/image/W0001!W0001-0005/full/full/0/default.jpg" title="view facsimile of p. 5">p. 5</a>"#
        );
    }

    #[test]
    fn milestones_are_decorated_anchors() {
        let (tei, cfg) =
            setup(r##"<p xml:id="p1"><milestone unit="article" rendition="#dagger" xml:id="m1"/></p>"##);
        let html = render(&tei, &cfg, "p1");
        assert!(html.contains(r#"<span class="milestone" id="m1"><sup>†</sup></span>"#));
    }

    #[test]
    fn ordered_items_carry_their_position() {
        let (tei, cfg) = setup(
            r#"<list type="ordered" xml:id="l1"><item xml:id="i1">A</item><item xml:id="i2">B</item></list>"#,
        );
        let html = render(&tei, &cfg, "i2");
        assert_eq!(html, r#"<li class="ordered" value="2">B</li>"#);
    }
}
