//! Resolution of `ref/@target` values and facsimile image URLs.
//!
//! Four target schemes are understood: in-work fragments (`#id`), links into
//! other works (`work:Wxxxx`), facsimile page references (`facs:Wxxxx-nnnn`,
//! same work only), and whatever the edition declares through `prefixDef`
//! entries. Plain web URLs pass through untouched.

use percent_encoding::percent_decode_str;
use regex::Regex;
use url::Url;

use crate::config::WorkConfig;
use crate::{Error, Result};

/// Resolves a reference target to an absolute URL.
///
/// `Ok(None)` means the target is syntactically fine but nothing in this
/// work maps it (e.g. an unknown fragment id); the caller keeps the text
/// without a link.
pub fn resolve_ref_target(cfg: &WorkConfig, target: &str) -> Result<Option<String>> {
    let decoded = percent_decode_str(target)
        .decode_utf8()
        .map_err(|_| Error::markup(format!("reference target is not UTF-8: {target}")))?;
    let target = decoded.trim();

    if let Some(id) = target.strip_prefix('#') {
        return Ok(cfg.citetrail(id).map(|ct| cfg.citation_uri(ct)));
    }
    if target.starts_with("facs:") {
        return resolve_facs_target(cfg, target);
    }
    if let Some(rest) = target.strip_prefix("work:") {
        let (wid, fragment) = match rest.split_once('#') {
            Some((wid, fragment)) => (wid, Some(fragment)),
            None => (rest, None),
        };
        // a self-reference through the work scheme is an in-work fragment
        if wid == cfg.wid() {
            if let Some(fragment) = fragment {
                return Ok(cfg.citetrail(fragment).map(|ct| cfg.citation_uri(ct)));
            }
            return Ok(Some(cfg.work_uri()));
        }
        return Ok(Some(format!(
            "{}/texts/{wid}",
            cfg.id_server().trim_end_matches('/')
        )));
    }
    if let Some((scheme, _)) = target.split_once(':') {
        if matches!(scheme, "http" | "https" | "mailto" | "ftp") {
            return Ok(Some(target.to_string()));
        }
        return apply_prefix_def(cfg, scheme, target);
    }
    Ok(None)
}

/// A facs target names a page of this work; referring to another work is a
/// markup error.
fn resolve_facs_target(cfg: &WorkConfig, target: &str) -> Result<Option<String>> {
    let work = Regex::new(r"^facs:(W\d+)")
        .expect("static regex")
        .captures(target)
        .and_then(|c| c.get(1))
        .ok_or_else(|| Error::markup(format!("malformed facs reference: {target}")))?;
    if work.as_str() != cfg.wid() {
        return Err(Error::markup(format!(
            "facs reference {target} points outside of work {}",
            cfg.wid()
        )));
    }
    let Some(page_id) = cfg.page_by_facs(target) else {
        return Ok(None);
    };
    Ok(cfg.citetrail(page_id).map(|ct| cfg.citation_uri(ct)))
}

fn apply_prefix_def(cfg: &WorkConfig, scheme: &str, target: &str) -> Result<Option<String>> {
    let Some(def) = cfg.prefix_def(scheme) else {
        return Err(Error::markup(format!(
            "no prefixDef for reference scheme {scheme}:"
        )));
    };
    let rest = &target[scheme.len() + 1..];
    if !def.pattern.is_match(rest) {
        return Ok(None);
    }
    let resolved = def.pattern.replace(rest, def.replacement.as_str()).to_string();
    Url::parse(&resolved).map_err(|e| {
        Error::markup(format!("prefixDef {scheme} produced an invalid URL: {e}"))
    })?;
    Ok(Some(resolved))
}

/// IIIF image URL for a page facsimile.
///
/// Two shapes are accepted: `facs:Wxxxx-nnnn` for single-volume works and
/// `facs:Wxxxx-V-nnnn` for multi-volume works.
pub fn iiif_image_url(cfg: &WorkConfig, facs: &str) -> Result<String> {
    let single = Regex::new(r"^facs:(W\d+)-(\d+)$").expect("static regex");
    let multi = Regex::new(r"^facs:(W\d+)-([A-Za-z]+)-(\d+)$").expect("static regex");
    let image_server = cfg.image_server();
    if let Some(caps) = single.captures(facs) {
        let work = &caps[1];
        let folio = &caps[2];
        return Ok(format!(
            "{image_server}/iiif/image/{work}!{work}-{folio}/full/full/0/default.jpg"
        ));
    }
    if let Some(caps) = multi.captures(facs) {
        let work = &caps[1];
        let volume = &caps[2];
        let folio = &caps[3];
        return Ok(format!(
            "{image_server}/iiif/image/{work}!{volume}!{work}-{volume}-{folio}/full/full/0/default.jpg"
        ));
    }
    Err(Error::markup(format!("malformed facs value: {facs}")))
}
