//! Zip archive validation and extraction.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::{InstallError, Result};

/// Counts reported after an extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

/// Archive extractor
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Whether `path` is a readable zip archive
    pub fn is_zip(path: &Path) -> bool {
        let Ok(file) = File::open(path) else {
            return false;
        };
        zip::ZipArchive::new(BufReader::new(file)).is_ok()
    }

    /// Extract every safe entry of a zip archive into `dest_dir`.
    ///
    /// Entries with absolute names or `..` segments are skipped, never written.
    pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<ExtractSummary> {
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(|e| {
            log::debug!("{} failed to open as zip: {}", archive_path.display(), e);
            InstallError::InvalidArchive {
                path: archive_path.to_path_buf(),
                attempts: 1,
            }
        })?;

        std::fs::create_dir_all(dest_dir)?;
        let mut summary = ExtractSummary::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();

            let Some(relative) = safe_relative_path(&name) else {
                log::debug!("Skipping unsafe archive entry: {}", name);
                summary.skipped += 1;
                continue;
            };

            // zip's own check catches anything the name-based one lets through
            if entry.enclosed_name().is_none() {
                log::debug!("Skipping archive entry outside destination: {}", name);
                summary.skipped += 1;
                continue;
            }

            let outpath = dest_dir.join(&relative);

            if name.ends_with('/') {
                std::fs::create_dir_all(&outpath)?;
                summary.directories += 1;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut outfile = File::create(&outpath)?;
            std::io::copy(&mut entry, &mut outfile)?;
            drop(outfile);

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    let mode = mode & 0o7777;
                    if mode != 0 {
                        std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
                    }
                }
            }

            summary.files += 1;
        }

        Ok(summary)
    }
}

/// `C:`, `C:/...` or `C:\...`; a colon anywhere else is an ordinary character
fn has_drive_prefix(name: &str) -> bool {
    match name.as_bytes() {
        [letter, b':'] => letter.is_ascii_alphabetic(),
        [letter, b':', b'/' | b'\\', ..] => letter.is_ascii_alphabetic(),
        _ => false,
    }
}

/// Turn an archive entry name into a relative path, or `None` when the name
/// is absolute or climbs out with a `..` segment.
fn safe_relative_path(name: &str) -> Option<PathBuf> {
    if name.starts_with('/') || name.starts_with('\\') {
        return None;
    }

    if has_drive_prefix(name) {
        return None;
    }

    let mut path = PathBuf::new();
    for segment in name.split(['/', '\\']) {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => path.push(s),
        }
    }

    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}
