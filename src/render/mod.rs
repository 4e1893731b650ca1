//! Rendering of basic nodes into plain text and HTML.
//!
//! Both targets share one dispatch: the element's local name selects a
//! [`TeiKind`] arm, unknown text-content elements are transparent, and
//! anything else is rejected. Pass-through descends in document order but
//! stops at descendants that are rendered as fragments of their own.

pub mod html;
pub mod refs;
pub mod txt;

use crate::config::WorkConfig;
use crate::tei::{Tei, normalize_space};

/// Reading layer of the plain-text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The diplomatic reading: abbreviations, original spellings, sic.
    Orig,
    /// The constituted reading: expansions, regularisations, corrections.
    Edit,
}

/// The closed set of TEI elements the renderer knows how to handle.
///
/// `Transparent` marks text-content elements that render as their children;
/// `Unknown` is everything else and aborts the fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeiKind {
    Abbr,
    Argument,
    Bibl,
    Byline,
    Cb,
    Cell,
    Choice,
    Corr,
    Del,
    Div,
    DocAuthor,
    DocImprint,
    Expan,
    Figure,
    Foreign,
    G,
    Gap,
    Head,
    Hi,
    Imprimatur,
    Item,
    Label,
    Lb,
    Lg,
    Line,
    List,
    Milestone,
    Name,
    Note,
    Orig,
    P,
    Pb,
    Ref,
    Reg,
    Row,
    Sic,
    Signed,
    Supplied,
    Table,
    Term,
    TitlePage,
    TitlePart,
    Transparent,
    Unknown,
}

impl TeiKind {
    pub fn from_name(name: &str) -> TeiKind {
        match name {
            "abbr" => TeiKind::Abbr,
            "argument" => TeiKind::Argument,
            "bibl" => TeiKind::Bibl,
            "byline" => TeiKind::Byline,
            "cb" => TeiKind::Cb,
            "cell" => TeiKind::Cell,
            "choice" => TeiKind::Choice,
            "corr" => TeiKind::Corr,
            "del" => TeiKind::Del,
            "div" => TeiKind::Div,
            "docAuthor" => TeiKind::DocAuthor,
            "docImprint" => TeiKind::DocImprint,
            "expan" => TeiKind::Expan,
            "figure" => TeiKind::Figure,
            "foreign" => TeiKind::Foreign,
            "g" => TeiKind::G,
            "gap" => TeiKind::Gap,
            "head" => TeiKind::Head,
            "hi" => TeiKind::Hi,
            "imprimatur" => TeiKind::Imprimatur,
            "item" => TeiKind::Item,
            "l" => TeiKind::Line,
            "label" => TeiKind::Label,
            "lb" => TeiKind::Lb,
            "lg" => TeiKind::Lg,
            "list" => TeiKind::List,
            "milestone" => TeiKind::Milestone,
            "name" | "orgName" | "persName" | "placeName" => TeiKind::Name,
            "note" => TeiKind::Note,
            "orig" => TeiKind::Orig,
            "p" => TeiKind::P,
            "pb" => TeiKind::Pb,
            "ref" => TeiKind::Ref,
            "reg" => TeiKind::Reg,
            "row" => TeiKind::Row,
            "sic" => TeiKind::Sic,
            "signed" => TeiKind::Signed,
            "supplied" => TeiKind::Supplied,
            "table" => TeiKind::Table,
            "term" => TeiKind::Term,
            "titlePage" => TeiKind::TitlePage,
            "titlePart" => TeiKind::TitlePart,
            // Text-content elements without a dedicated arm.
            "address" | "addrLine" | "body" | "damage" | "date" | "docDate"
            | "docEdition" | "docTitle" | "emph" | "num" | "pubPlace"
            | "publisher" | "q" | "quote" | "seg" | "text" | "title"
            | "unclear" => TeiKind::Transparent,
            _ => TeiKind::Unknown,
        }
    }
}

/// Shared context of one rendering run.
pub struct Renderer<'a> {
    pub tei: &'a Tei,
    pub cfg: &'a WorkConfig,
}

impl<'a> Renderer<'a> {
    pub fn new(tei: &'a Tei, cfg: &'a WorkConfig) -> Self {
        Self { tei, cfg }
    }

    /// The sibling variant inside a `tei:choice`, if any.
    pub(crate) fn choice_counterpart(
        &self,
        node: xot::Node,
        names: &[&str],
    ) -> Option<xot::Node> {
        let parent = self.tei.parent(node)?;
        if !self.tei.is(parent, "choice") {
            return None;
        }
        self.tei
            .child_elements(parent)
            .find(|sibling| names.iter().any(|n| self.tei.is(*sibling, *n)))
    }
}

/// Final form of a rendered text fragment: whitespace collapsed, boundary
/// page separators dropped.
pub fn fragment_string(s: &str) -> String {
    normalize_space(s)
        .trim_matches(|c: char| c == '|' || c.is_whitespace())
        .to_string()
}

/// The marginalia placeholder emitted into plain text; stable under
/// whitespace collapsing.
pub fn note_token(id: &str) -> String {
    format!("{{%note:{id}%}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_cover_the_dispatch_table() {
        assert_eq!(TeiKind::from_name("p"), TeiKind::P);
        assert_eq!(TeiKind::from_name("persName"), TeiKind::Name);
        assert_eq!(TeiKind::from_name("quote"), TeiKind::Transparent);
        assert_eq!(TeiKind::from_name("figDesc"), TeiKind::Unknown);
    }

    #[test]
    fn fragment_string_trims_page_separators() {
        assert_eq!(fragment_string("| Hello  world |"), "Hello world");
        assert_eq!(fragment_string("  a | b  "), "a | b");
    }

    #[test]
    fn note_tokens_survive_collapsing() {
        let token = note_token("n1");
        assert_eq!(normalize_space(&token), token);
    }
}
