//! The work transformation pipeline.
//!
//! One request, one run: parse and expand the edition, read the header
//! configuration, build and resolve the index, render every basic node,
//! and write the four artefacts. All output is buffered until the whole
//! run has succeeded, so a failed transformation leaves no partial files.

use std::path::PathBuf;

use crate::assemble::{assemble, index_to_xml};
use crate::config::WorkConfig;
use crate::index::build_index;
use crate::metadata::make_resource_metadata;
use crate::resolve::resolve_index;
use crate::settings::FactorySettings;
use crate::tei::Tei;
use crate::{Error, Result};

/// Summary of a finished transformation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransformOutcome {
    pub wid: String,
    pub passages: usize,
    #[serde(rename = "citeDepth")]
    pub cite_depth: usize,
    pub files: Vec<PathBuf>,
}

/// Transforms one work and writes its artefacts.
pub fn transform(wid: &str, settings: &FactorySettings) -> Result<TransformOutcome> {
    let path = work_path(wid, settings)?;
    println!("Transforming work {wid} from {}", path.display());

    let tei = Tei::load(&path)?;
    let mut cfg = WorkConfig::new(wid, &settings.id_server, &settings.image_server);
    cfg.read_header(&tei)?;

    let mut index = build_index(&tei, &mut cfg)?;
    let index0_xml = index_to_xml(&index, false);
    resolve_index(&mut index, &mut cfg)?;
    let index_xml = index_to_xml(&index, true);

    let records = assemble(&tei, &cfg, &index)?;
    let resources_json = serde_json::to_string_pretty(&records)
        .expect("passage records serialise to JSON");
    let metadata = make_resource_metadata(&tei, &cfg)?;
    let metadata_json =
        serde_json::to_string_pretty(&metadata).expect("metadata serialises to JSON");

    std::fs::create_dir_all(&settings.out_root)?;
    let artefacts = [
        (format!("{wid}_index0.xml"), index0_xml),
        (format!("{wid}_index.xml"), index_xml),
        (format!("{wid}_resources.json"), resources_json),
        (format!("{wid}_metadata.json"), metadata_json),
    ];
    let mut files = Vec::new();
    for (name, content) in artefacts {
        let path = settings.out_root.join(name);
        std::fs::write(&path, content)?;
        files.push(path);
    }

    Ok(TransformOutcome {
        wid: wid.to_string(),
        passages: records.len(),
        cite_depth: cfg.cite_depth(),
        files,
    })
}

/// Maps a work id to its edition file, rejecting ids that name no resource.
fn work_path(wid: &str, settings: &FactorySettings) -> Result<PathBuf> {
    let valid = !wid.is_empty()
        && wid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(Error::QueryValidation(format!("invalid work id: {wid}")));
    }
    let path = settings.data_root.join(format!("{wid}.xml"));
    if !path.is_file() {
        return Err(Error::QueryValidation(format!(
            "no edition file for work id {wid}"
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_work_ids_are_rejected_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let settings = FactorySettings {
            data_root: dir.path().join("data"),
            out_root: dir.path().join("out"),
            ..FactorySettings::default()
        };
        let result = transform("W9999", &settings);
        assert!(matches!(result, Err(Error::QueryValidation(_))));
        assert!(!settings.out_root.exists());
    }

    #[test]
    fn path_traversal_is_not_a_work_id() {
        let settings = FactorySettings::default();
        assert!(matches!(
            work_path("../etc/passwd", &settings),
            Err(Error::QueryValidation(_))
        ));
    }
}
