//! Factory-level settings: where editions live, where artefacts go, and the
//! public URLs baked into citation links.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Result;

/// Settings shared by all requests, read once at startup.
///
/// All fields have defaults so a missing `factory.yaml` is not an error.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactorySettings {
    /// Directory containing `<work_id>.xml` editions.
    pub data_root: PathBuf,
    /// Directory the output artefacts are written to.
    pub out_root: PathBuf,
    /// Base URL of the id server used in citation URIs.
    pub id_server: String,
    /// Base URL of the IIIF image server used in page links.
    pub image_server: String,
    /// Port for the serve layer.
    pub port: u16,
}

impl Default for FactorySettings {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            out_root: PathBuf::from("out"),
            id_server: "https://id.salamanca.school".to_string(),
            image_server: "https://facs.salamanca.school".to_string(),
            port: 3000,
        }
    }
}

impl FactorySettings {
    /// Reads settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&src).map_err(|e| {
            crate::Error::QueryValidation(format!(
                "invalid settings file {}: {e}",
                path.display()
            ))
        })
    }

    /// Reads `factory.yaml` from the working directory if present, falling
    /// back to the defaults.
    pub fn discover() -> Result<Self> {
        let candidate = Path::new("factory.yaml");
        if candidate.is_file() {
            Self::load(candidate)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let settings = FactorySettings::default();
        assert_eq!(settings.data_root, PathBuf::from("data"));
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let settings: FactorySettings =
            serde_yaml::from_str("data_root: /srv/tei\nport: 8080\n").unwrap();
        assert_eq!(settings.data_root, PathBuf::from("/srv/tei"));
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.out_root, PathBuf::from("out"));
    }
}
