//! Moving the extracted tree into the project layout.
//!
//! Works on any staged directory, so it can be driven without running an
//! extraction first.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{InstallError, Result};

/// One relocation: `<libs_dir>/<source>` moves to `<work_root>/<parent>/<source>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub source: String,
    pub parent: String,
}

impl Relocation {
    pub fn new(source: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            parent: parent.into(),
        }
    }
}

/// Inputs of the relocation stage
#[derive(Debug, Clone)]
pub struct RelocationPlan<'a> {
    pub work_root: &'a Path,
    /// Extraction output; must contain a `<version>` directory
    pub staging_dir: &'a Path,
    /// Directory the staging tree is merged into (`libs/`)
    pub final_parent: &'a Path,
    /// Name of the version directory inside the staging tree
    pub version: &'a str,
    /// Final engine directory the version directory is renamed to
    pub engine_dir: &'a Path,
    pub relocations: &'a [Relocation],
}

/// What the relocation stage did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationReport {
    pub engine_dir: PathBuf,
    pub moved: Vec<(PathBuf, PathBuf)>,
}

/// Copy the staged tree into place, rename the version directory and apply
/// the configured relocations, in that order.
pub fn relocate(plan: &RelocationPlan<'_>) -> Result<RelocationReport> {
    if !plan.staging_dir.is_dir() {
        return Err(InstallError::MissingStagedDir {
            path: plan.staging_dir.to_path_buf(),
        });
    }

    copy_tree(plan.staging_dir, plan.final_parent)?;

    let copied_version_dir = plan.final_parent.join(plan.version);
    if !copied_version_dir.is_dir() {
        return Err(InstallError::MissingStagedDir {
            path: copied_version_dir,
        });
    }
    if plan.engine_dir.exists() {
        std::fs::remove_dir_all(plan.engine_dir)?;
    }
    log::debug!(
        "Renaming {} -> {}",
        copied_version_dir.display(),
        plan.engine_dir.display()
    );
    std::fs::rename(&copied_version_dir, plan.engine_dir)?;

    let mut report = RelocationReport {
        engine_dir: plan.engine_dir.to_path_buf(),
        moved: Vec::new(),
    };

    for relocation in plan.relocations {
        let from = plan.final_parent.join(&relocation.source);
        let to = plan.work_root.join(&relocation.parent).join(&relocation.source);

        if !from.exists() {
            return Err(InstallError::MissingStagedDir { path: from });
        }
        if to.is_dir() {
            log::debug!("Removing existing {}", to.display());
            std::fs::remove_dir_all(&to)?;
        } else if to.exists() {
            std::fs::remove_file(&to)?;
        }

        move_dir(&from, &to)?;
        report.moved.push((from, to));
    }

    Ok(report)
}

/// Recursively copy `src` into `dest`, merging with and overwriting whatever
/// is already there.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<u64> {
    std::fs::create_dir_all(dest)?;
    let mut copied = 0;

    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| InstallError::CopyFailed {
            from: src.to_path_buf(),
            to: dest.to_path_buf(),
            reason: e.to_string(),
        })?;

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| InstallError::CopyFailed {
                from: entry.path().to_path_buf(),
                to: dest.to_path_buf(),
                reason: e.to_string(),
            })?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Move a directory, falling back to copy + delete when a rename isn't
/// possible (e.g. across filesystems).
pub fn move_dir(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent)?;
    }

    log::debug!("Moving {} -> {}", from.display(), to.display());
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::debug!("rename failed ({}), copying instead", e);
            if from.is_dir() {
                copy_tree(from, to)?;
                std::fs::remove_dir_all(from)?;
            } else {
                std::fs::copy(from, to)?;
                std::fs::remove_file(from)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    /// Lay out what an extraction of `engine-1.0.zip` produces
    fn stage(root: &Path) -> PathBuf {
        let staging = root.join("engine-1.0");
        touch(&staging.join("engine-1.0/cocos/core.h"), "core");
        touch(&staging.join("foo/tool.py"), "tool");
        staging
    }

    #[test]
    fn test_copy_tree_merges_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        touch(&src.join("a.txt"), "new");
        touch(&src.join("sub/b.txt"), "b");
        touch(&dest.join("a.txt"), "old");
        touch(&dest.join("keep.txt"), "keep");

        let copied = copy_tree(&src, &dest).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(std::fs::read_to_string(dest.join("a.txt")).unwrap(), "new");
        assert_eq!(std::fs::read_to_string(dest.join("sub/b.txt")).unwrap(), "b");
        assert_eq!(std::fs::read_to_string(dest.join("keep.txt")).unwrap(), "keep");
    }

    #[test]
    fn test_relocate_renames_and_moves() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let staging = stage(root);
        let libs = root.join("libs");
        let engine_dir = libs.join("cocos2d-x");

        // Stale relocation target must be replaced, not merged
        touch(&root.join("bar/foo/stale.txt"), "stale");

        let relocations = vec![Relocation::new("foo", "bar")];
        let report = relocate(&RelocationPlan {
            work_root: root,
            staging_dir: &staging,
            final_parent: &libs,
            version: "engine-1.0",
            engine_dir: &engine_dir,
            relocations: &relocations,
        })
        .unwrap();

        assert_eq!(report.engine_dir, engine_dir);
        assert!(engine_dir.join("cocos/core.h").is_file());
        assert!(!libs.join("engine-1.0").exists());

        assert_eq!(
            std::fs::read_to_string(root.join("bar/foo/tool.py")).unwrap(),
            "tool"
        );
        assert!(!root.join("bar/foo/stale.txt").exists());
        assert!(!libs.join("foo").exists());
        assert_eq!(
            report.moved,
            vec![(libs.join("foo"), root.join("bar/foo"))]
        );
    }

    #[test]
    fn test_relocate_replaces_existing_engine_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let staging = stage(root);
        let libs = root.join("libs");
        let engine_dir = libs.join("cocos2d-x");
        touch(&engine_dir.join("old.h"), "old");

        relocate(&RelocationPlan {
            work_root: root,
            staging_dir: &staging,
            final_parent: &libs,
            version: "engine-1.0",
            engine_dir: &engine_dir,
            relocations: &[],
        })
        .unwrap();

        assert!(engine_dir.join("cocos/core.h").is_file());
        assert!(!engine_dir.join("old.h").exists());
    }

    #[test]
    fn test_relocate_requires_staging_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let libs = root.join("libs");

        let err = relocate(&RelocationPlan {
            work_root: root,
            staging_dir: &root.join("missing"),
            final_parent: &libs,
            version: "engine-1.0",
            engine_dir: &libs.join("cocos2d-x"),
            relocations: &[],
        })
        .unwrap_err();

        assert!(matches!(err, InstallError::MissingStagedDir { .. }));
    }

    #[test]
    fn test_relocate_requires_version_dir() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let staging = root.join("engine-1.0");
        touch(&staging.join("wrong-name/file"), "x");
        let libs = root.join("libs");

        let err = relocate(&RelocationPlan {
            work_root: root,
            staging_dir: &staging,
            final_parent: &libs,
            version: "engine-1.0",
            engine_dir: &libs.join("cocos2d-x"),
            relocations: &[],
        })
        .unwrap_err();

        match err {
            InstallError::MissingStagedDir { path } => assert_eq!(path, libs.join("engine-1.0")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_move_dir_creates_parent() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("from");
        touch(&from.join("x.txt"), "x");
        let to = temp.path().join("a/b/to");

        move_dir(&from, &to).unwrap();

        assert!(!from.exists());
        assert!(to.join("x.txt").is_file());
    }
}
