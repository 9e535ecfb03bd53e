//! Filesystem paths used by an install run.

use std::path::{Path, PathBuf};

use crate::descriptor::Descriptor;

/// Name of the final engine directory under `libs/`
pub const ENGINE_DIR_NAME: &str = "cocos2d-x";

/// Directory holding the descriptor and the installed engine
pub const LIBS_DIR_NAME: &str = "libs";

/// Descriptor file name inside `libs/`
pub const DESCRIPTOR_FILE_NAME: &str = "config.json";

/// All paths of a run, derived from the work root and the descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    pub work_root: PathBuf,
    pub descriptor_path: PathBuf,
    pub staging_dir: PathBuf,
    pub libs_dir: PathBuf,
    pub engine_dir: PathBuf,
    pub archive_path: PathBuf,
}

impl InstallLayout {
    /// Build the layout. `archive_dir` is where the archive is downloaded to.
    pub fn new(
        work_root: impl Into<PathBuf>,
        descriptor_path: impl Into<PathBuf>,
        archive_dir: &Path,
        descriptor: &Descriptor,
    ) -> Self {
        let work_root = work_root.into();
        let libs_dir = work_root.join(LIBS_DIR_NAME);

        Self {
            staging_dir: work_root.join(&descriptor.version),
            engine_dir: libs_dir.join(ENGINE_DIR_NAME),
            archive_path: archive_dir.join(descriptor.archive_file_name()),
            descriptor_path: descriptor_path.into(),
            libs_dir,
            work_root,
        }
    }

    /// Default descriptor location for a work root
    pub fn default_descriptor_path(work_root: &Path) -> PathBuf {
        work_root.join(LIBS_DIR_NAME).join(DESCRIPTOR_FILE_NAME)
    }
}
