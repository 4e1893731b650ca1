//! Plain-text rendering of TEI content.
//!
//! One function per concern, parametrised by [`Mode`]: the orig mode keeps
//! abbreviations and original spellings, the edit mode their editorial
//! counterparts. Exactly one variant of each `tei:choice` survives.

use crate::classify;
use crate::render::{Mode, Renderer, TeiKind, note_token};
use crate::tei::collapse_whitespace;
use crate::{Error, Result};

use regex::Regex;

impl Renderer<'_> {
    /// Renders a node to plain text.
    pub fn txt(&self, node: xot::Node, mode: Mode) -> Result<String> {
        if let Some(text) = self.tei.text_value(node) {
            return Ok(collapse_whitespace(text));
        }
        if !self.tei.is_element(node) {
            // comments and processing instructions are omitted
            return Ok(String::new());
        }
        let Some(name) = self.tei.local_name(node) else {
            return Ok(String::new());
        };
        let name = name.to_string();
        match TeiKind::from_name(&name) {
            TeiKind::Abbr => self.txt_orig_variant(node, mode, &["expan"]),
            TeiKind::Orig => self.txt_orig_variant(node, mode, &["reg"]),
            TeiKind::Sic => self.txt_orig_variant(node, mode, &["corr"]),
            TeiKind::Expan => self.txt_edit_variant(node, mode, &["abbr"]),
            TeiKind::Reg => self.txt_edit_variant(node, mode, &["orig"]),
            TeiKind::Corr => self.txt_edit_variant(node, mode, &["sic"]),
            TeiKind::Bibl => self.txt_bibl(node, mode),
            TeiKind::Cb | TeiKind::Lb => Ok(self.txt_break(node)),
            TeiKind::Del => self.txt_del(node, mode),
            TeiKind::Div => self.txt_div(node, mode),
            TeiKind::G => self.txt_g(node, mode),
            TeiKind::Milestone => Ok(String::new()),
            TeiKind::Pb => Ok("|".to_string()),
            TeiKind::Figure | TeiKind::Gap => Ok(String::new()),
            TeiKind::Cell => Ok(format!("{} ", self.txt_children(node, mode)?)),
            TeiKind::Row | TeiKind::Line | TeiKind::Item => {
                Ok(format!("{}\n", self.txt_children(node, mode)?))
            }
            TeiKind::Unknown => Err(Error::UnknownElement(name)),
            _ => self.txt_children(node, mode),
        }
    }

    /// Pass-through: children in document order, stopping at fragment
    /// boundaries. Marginal children leave a placeholder token behind.
    pub(crate) fn txt_children(&self, node: xot::Node, mode: Mode) -> Result<String> {
        let mut out = String::new();
        for child in self.tei.children(node) {
            if self.tei.is_element(child) {
                if classify::is_marginal_elem(self.tei, child) {
                    if let Some(id) = self.tei.xml_id(child) {
                        out.push_str(&note_token(&id));
                    }
                    continue;
                }
                if classify::is_structural_elem(self.tei, child) {
                    continue;
                }
            }
            out.push_str(&self.txt(child, mode)?);
        }
        Ok(out)
    }

    /// An original-layer variant: silent in edit mode when the choice has an
    /// editorial counterpart.
    fn txt_orig_variant(
        &self,
        node: xot::Node,
        mode: Mode,
        counterparts: &[&str],
    ) -> Result<String> {
        if mode == Mode::Edit && self.choice_counterpart(node, counterparts).is_some() {
            Ok(String::new())
        } else {
            self.txt_children(node, mode)
        }
    }

    /// An edit-layer variant: silent in orig mode when the choice has an
    /// original counterpart.
    fn txt_edit_variant(
        &self,
        node: xot::Node,
        mode: Mode,
        counterparts: &[&str],
    ) -> Result<String> {
        if mode == Mode::Orig && self.choice_counterpart(node, counterparts).is_some() {
            Ok(String::new())
        } else {
            self.txt_children(node, mode)
        }
    }

    fn txt_bibl(&self, node: xot::Node, mode: Mode) -> Result<String> {
        let text = self.txt_children(node, mode)?;
        match self.tei.attr(node, "sortKey") {
            Some(key) if mode == Mode::Edit => {
                Ok(format!("{text} [{}]", key.replace('_', ", ")))
            }
            _ => Ok(text),
        }
    }

    pub(crate) fn txt_break(&self, node: xot::Node) -> String {
        if self.tei.attr(node, "break").as_deref() == Some("no") {
            String::new()
        } else {
            " ".to_string()
        }
    }

    fn txt_del(&self, node: xot::Node, mode: Mode) -> Result<String> {
        if self.tei.find_child(node, "supplied").is_none() {
            return Err(Error::markup("no child tei:supplied exists in tei:del"));
        }
        self.txt_children(node, mode)
    }

    fn txt_div(&self, node: xot::Node, mode: Mode) -> Result<String> {
        let text = self.txt_children(node, mode)?;
        if mode == Mode::Orig {
            return Ok(text);
        }
        let numeric = Regex::new(r"^[\[\]\d]+$").expect("static regex");
        let title = match self.tei.attr(node, "n") {
            Some(n) if !numeric.is_match(&n) => format!("[ *{n}* ]\n"),
            _ => String::new(),
        };
        Ok(format!("\n{title}{text}\n"))
    }

    /// Special glyphs. The original layer prefers the declared precomposed
    /// form; the edit layer standardizes long s/z and keeps ad-hoc
    /// expansions verbatim.
    fn txt_g(&self, node: xot::Node, mode: Mode) -> Result<String> {
        let glyph = self.glyph_of(node)?;
        let text = self.tei.string_value(node);
        if text.is_empty() {
            return Err(Error::markup("tei:g does not contain text"));
        }
        match mode {
            Mode::Orig => glyph
                .precomposed
                .clone()
                .or_else(|| glyph.composed.clone())
                .or_else(|| glyph.standardized.clone())
                .ok_or_else(|| Error::markup("glyph declares no mapping")),
            Mode::Edit => {
                let code = self.glyph_code(node).unwrap_or_default();
                if matches!(code.as_str(), "char017f" | "char0292")
                    && glyph.matches_original(&text)
                {
                    glyph
                        .standardized
                        .clone()
                        .ok_or_else(|| Error::markup("glyph declares no standardized form"))
                } else {
                    self.txt_children(node, mode)
                }
            }
        }
    }

    pub(crate) fn glyph_code(&self, node: xot::Node) -> Option<String> {
        self.tei
            .attr(node, "ref")
            .map(|r| r.trim_start_matches('#').to_string())
    }

    pub(crate) fn glyph_of(&self, node: xot::Node) -> Result<&crate::config::GlyphMapping> {
        let code = self
            .glyph_code(node)
            .ok_or_else(|| Error::markup("tei:g without @ref"))?;
        self.cfg
            .glyph(&code)
            .ok_or_else(|| Error::markup(format!("glyph {code} is not declared")))
    }
}
