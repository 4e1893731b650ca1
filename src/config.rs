//! Per-request work configuration.
//!
//! Everything the pipeline accumulates or looks up while transforming one
//! work lives here: the glyph table and prefix definitions read from the
//! teiHeader, the citetrail/passagetrail maps filled by the resolver, and
//! the running citation depth. The configuration is owned by a single
//! request and never shared.

use std::collections::HashMap;

use regex::Regex;

use crate::tei::Tei;
use crate::{Error, Result};

/// Maximum length of node title teasers.
pub const TEASER_LENGTH: usize = 60;
/// Maximum length of passagetrail teasers.
pub const PASSAGE_TEASER_LENGTH: usize = 15;

/// CSS class names for the two editorial layers.
pub const ORIG_CLASS: &str = "orig";
pub const EDIT_CLASS: &str = "edit";

/// Character mappings declared for one glyph in the `charDecl`.
#[derive(Debug, Clone, Default)]
pub struct GlyphMapping {
    pub precomposed: Option<String>,
    pub composed: Option<String>,
    pub standardized: Option<String>,
}

impl GlyphMapping {
    /// The original (non-standardized) form, preferring the composed string
    /// since some precomposed characters render oddly in certain contexts.
    pub fn original(&self) -> Option<&str> {
        self.composed.as_deref().or(self.precomposed.as_deref())
    }

    /// True iff `text` equals the precomposed or composed form.
    pub fn matches_original(&self, text: &str) -> bool {
        self.precomposed.as_deref() == Some(text) || self.composed.as_deref() == Some(text)
    }
}

/// A TEI `prefixDef`: a URI scheme expanded by regex replacement.
#[derive(Debug)]
pub struct PrefixDef {
    pub ident: String,
    pub pattern: Regex,
    pub replacement: String,
}

/// A row of the citation-label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitationLabel {
    pub full: &'static str,
    pub abbr: &'static str,
    pub cite_ref: bool,
}

const fn label(full: &'static str, abbr: &'static str, cite_ref: bool) -> CitationLabel {
    CitationLabel {
        full,
        abbr,
        cite_ref,
    }
}

/// Citation labels keyed by `div/@type`, `milestone/@unit`, or local element
/// name.
pub fn citation_label(key: &str) -> Option<CitationLabel> {
    let label = match key {
        "additional" => label("addendum", "add.", true),
        "administrative" => label("administratio", "admin.", false),
        "article" => label("articulus", "art.", true),
        "book" => label("liber", "lib.", true),
        "chapter" => label("capitulum", "cap.", true),
        "colophon" => label("colophon", "coloph.", true),
        "commentary" => label("commentarius", "comment.", true),
        "contents" => label("tabula", "tab.", true),
        "corrigenda" => label("corrigenda", "corr.", true),
        "dedication" => label("dedicatio", "dedic.", true),
        "disputation" => label("disputatio", "disp.", true),
        "doubt" => label("dubium", "dub.", true),
        "foreword" => label("prooemium", "pr.", true),
        "gloss" => label("glossa", "gl.", true),
        "index" => label("index", "ind.", true),
        "law" => label("lex", "l.", true),
        "lecture" => label("relectio", "relect.", true),
        "number" => label("numerus", "num.", true),
        "part" => label("pars", "pars", true),
        "partida" => label("partida", "part.", true),
        "preface" => label("praefatio", "praef.", true),
        "privileges" => label("privilegium", "priv.", true),
        "question" => label("quaestio", "q.", true),
        "section" => label("sectio", "sect.", false),
        "segment" => label("sectio", "sect.", true),
        "source" => label("sectio", "sect.", false),
        "title" => label("titulus", "tit.", true),
        "back" => label("appendix", "append.", true),
        "front" => label("front", "front.", false),
        "titlePage" => label("titulus", "tit.", false),
        "pb" => label("pagina", "pag.", true),
        "p" => label("paragraphus", "paragr.", true),
        "note" => label("nota", "not.", true),
        _ => return None,
    };
    Some(label)
}

/// Mutable, request-scoped state of one transformation.
pub struct WorkConfig {
    wid: String,
    id_server: String,
    image_server: String,
    chars: HashMap<String, GlyphMapping>,
    prefix_defs: Vec<PrefixDef>,
    citetrails: HashMap<String, String>,
    passagetrails: HashMap<String, String>,
    /// `@facs` value of each page break, mapped to its `xml:id`.
    pages: HashMap<String, String>,
    cite_depth: usize,
}

impl WorkConfig {
    pub fn new(wid: &str, id_server: &str, image_server: &str) -> Self {
        Self {
            wid: wid.to_string(),
            id_server: id_server.trim_end_matches('/').to_string(),
            image_server: image_server.trim_end_matches('/').to_string(),
            chars: HashMap::new(),
            prefix_defs: Vec::new(),
            citetrails: HashMap::new(),
            passagetrails: HashMap::new(),
            pages: HashMap::new(),
            cite_depth: 0,
        }
    }

    pub fn wid(&self) -> &str {
        &self.wid
    }

    pub fn id_server(&self) -> &str {
        &self.id_server
    }

    pub fn image_server(&self) -> &str {
        &self.image_server
    }

    /// Reads the glyph table and prefix definitions from the teiHeader,
    /// checking the basic document shape (one header, one text).
    pub fn read_header(&mut self, tei: &Tei) -> Result<()> {
        let root = tei.document_element()?;
        let headers: Vec<_> = tei
            .child_elements(root)
            .filter(|n| tei.is(*n, "teiHeader"))
            .collect();
        if headers.len() != 1 {
            return Err(Error::markup("expected exactly one tei:teiHeader"));
        }
        let header = headers[0];
        let texts = tei
            .child_elements(root)
            .filter(|n| tei.is(*n, "text"))
            .count();
        if texts != 1 {
            return Err(Error::markup("expected exactly one tei:text"));
        }

        let char_decl = tei
            .find_descendant(header, "charDecl")
            .ok_or_else(|| Error::markup("teiHeader has no tei:charDecl"))?;
        for ch in tei.child_elements(char_decl) {
            if !tei.is(ch, "char") {
                continue;
            }
            let Some(id) = tei.xml_id(ch) else {
                continue;
            };
            let mut mapping = GlyphMapping::default();
            for m in tei.child_elements(ch) {
                if !tei.is(m, "mapping") {
                    continue;
                }
                let value = tei.string_value(m);
                match tei.attr(m, "type").as_deref() {
                    Some("precomposed") => mapping.precomposed = Some(value),
                    Some("composed") => mapping.composed = Some(value),
                    Some("standardized") => mapping.standardized = Some(value),
                    _ => {}
                }
            }
            self.chars.insert(id, mapping);
        }

        for pd in tei.descendants(header).filter(|n| tei.is(*n, "prefixDef")) {
            self.add_prefix_def(tei, pd)?;
        }
        Ok(())
    }

    fn add_prefix_def(&mut self, tei: &Tei, pd: xot::Node) -> Result<()> {
        let ident = tei
            .attr(pd, "ident")
            .ok_or_else(|| Error::markup("prefixDef without @ident"))?;
        let match_pattern = tei
            .attr(pd, "matchPattern")
            .ok_or_else(|| Error::markup("prefixDef without @matchPattern"))?;
        let replacement = tei
            .attr(pd, "replacementPattern")
            .ok_or_else(|| Error::markup("prefixDef without @replacementPattern"))?;
        let pattern = Regex::new(&match_pattern).map_err(|e| {
            Error::markup(format!("prefixDef {ident} has an invalid pattern: {e}"))
        })?;
        self.prefix_defs.push(PrefixDef {
            ident,
            pattern,
            replacement,
        });
        Ok(())
    }

    pub fn glyph(&self, code: &str) -> Option<&GlyphMapping> {
        self.chars.get(code)
    }

    pub fn prefix_def(&self, ident: &str) -> Option<&PrefixDef> {
        self.prefix_defs.iter().find(|pd| pd.ident == ident)
    }

    pub fn put_citetrail(&mut self, id: &str, citetrail: &str) {
        self.citetrails.insert(id.to_string(), citetrail.to_string());
    }

    pub fn citetrail(&self, id: &str) -> Option<&str> {
        self.citetrails.get(id).map(String::as_str)
    }

    pub fn put_passagetrail(&mut self, id: &str, passagetrail: &str) {
        self.passagetrails
            .insert(id.to_string(), passagetrail.to_string());
    }

    pub fn passagetrail(&self, id: &str) -> Option<&str> {
        self.passagetrails.get(id).map(String::as_str)
    }

    pub fn register_page(&mut self, facs: &str, id: &str) {
        self.pages.insert(facs.to_string(), id.to_string());
    }

    pub fn page_by_facs(&self, facs: &str) -> Option<&str> {
        self.pages.get(facs).map(String::as_str)
    }

    pub fn observe_level(&mut self, level: usize) {
        self.cite_depth = self.cite_depth.max(level);
    }

    pub fn cite_depth(&self) -> usize {
        self.cite_depth
    }

    /// Citation URI for a citetrail within this work.
    pub fn citation_uri(&self, citetrail: &str) -> String {
        format!("{}/texts/{}:{citetrail}", self.id_server, self.wid)
    }

    /// Citation URI for the work itself.
    pub fn work_uri(&self) -> String {
        format!("{}/texts/{}", self.id_server, self.wid)
    }
}
