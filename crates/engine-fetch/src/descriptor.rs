//! Release descriptor (`libs/config.json`).
//!
//! The descriptor names the engine version to install, where to download it
//! from, how large the archive is expected to be, and which sub-directories of
//! the extracted tree must be relocated into the project.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::path::Path;

use crate::{InstallError, Result};

/// Metadata driving a single install run. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Descriptor {
    /// Engine version; also the archive stem and the staging directory name
    pub version: String,

    /// URL prefix the archive file name is appended to
    #[serde(rename = "downloadUrl")]
    pub download_url: String,

    /// Expected archive size in bytes, used when the server omits Content-Length
    #[serde(deserialize_with = "deserialize_size")]
    pub zip_file_size: u64,

    /// Relative source directory -> relative destination parent directory
    #[serde(default)]
    pub move_dirs: Option<IndexMap<String, String>>,
}

impl Descriptor {
    /// Load and validate a descriptor from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(InstallError::DescriptorNotFound {
                path: path.to_path_buf(),
            });
        }

        log::debug!("Reading descriptor {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let descriptor: Descriptor =
            serde_json::from_str(&content).map_err(|source| InstallError::DescriptorParse {
                path: path.to_path_buf(),
                source,
            })?;

        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check the invariants serde can't express
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(InstallError::InvalidDescriptor {
                message: "'version' must not be empty".to_string(),
            });
        }
        if self.download_url.trim().is_empty() {
            return Err(InstallError::InvalidDescriptor {
                message: "'downloadUrl' must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// `<version>.zip`
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.version)
    }

    /// Full URL of the archive
    pub fn archive_url(&self) -> String {
        format!("{}{}", self.download_url, self.archive_file_name())
    }

    /// Configured relocations in declaration order
    pub fn relocations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.move_dirs
            .iter()
            .flat_map(|dirs| dirs.iter().map(|(src, dst)| (src.as_str(), dst.as_str())))
    }
}

/// `zip_file_size` is written as a string in existing descriptors, accept both forms.
fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(u64),
        Text(String),
    }

    match Size::deserialize(deserializer)? {
        Size::Number(n) => Ok(n),
        Size::Text(s) => s.trim().parse::<u64>().map_err(|e| {
            serde::de::Error::custom(format!("invalid zip_file_size '{}': {}", s, e))
        }),
    }
}
