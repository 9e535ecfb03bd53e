//! Template formatting run after the engine is in place.
//!
//! The installer only knows the [`TemplateFormatter`] seam. [`ProjectFormatter`]
//! is the stock implementation: it reads `libs/format_template.json` and patches
//! project files relative to the work root.
//!
//! ```json
//! {
//!   "modify_files": {
//!     "proj.android/build.gradle": [["COCOS_PATH=", "COCOS_PATH=../libs/cocos2d-x"]]
//!   },
//!   "modify_mul_line_files": {
//!     "CMakeLists.txt": [{ "search": "a\nb", "replace": "c" }]
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::layout::LIBS_DIR_NAME;
use crate::{InstallError, Result};

/// Template config file name inside `libs/`
pub const TEMPLATE_CONFIG_FILE_NAME: &str = "format_template.json";

/// Files touched by a formatting pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatReport {
    pub modified: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

/// Post-install template substitution
pub trait TemplateFormatter {
    fn format(&self, work_root: &Path) -> Result<FormatReport>;
}

/// Formatter that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFormatter;

impl TemplateFormatter for NoopFormatter {
    fn format(&self, _work_root: &Path) -> Result<FormatReport> {
        Ok(FormatReport::default())
    }
}

/// Whole-block replacement for `modify_mul_line_files`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockReplacement {
    pub search: String,
    pub replace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// file -> [(search, replacement line)]; every line containing `search`
    /// is replaced by the replacement line
    pub modify_files: IndexMap<String, Vec<(String, String)>>,

    /// file -> block replacements applied to the whole text
    pub modify_mul_line_files: IndexMap<String, Vec<BlockReplacement>>,
}

impl TemplateConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| InstallError::TemplateConfig {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Formatter driven by `libs/format_template.json`
#[derive(Debug, Clone, Default)]
pub struct ProjectFormatter {
    config_path: Option<PathBuf>,
}

impl ProjectFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a config file other than `<work_root>/libs/format_template.json`
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    fn config_path(&self, work_root: &Path) -> PathBuf {
        self.config_path.clone().unwrap_or_else(|| {
            work_root
                .join(LIBS_DIR_NAME)
                .join(TEMPLATE_CONFIG_FILE_NAME)
        })
    }
}

impl TemplateFormatter for ProjectFormatter {
    fn format(&self, work_root: &Path) -> Result<FormatReport> {
        let config_path = self.config_path(work_root);
        if !config_path.is_file() {
            log::debug!("No template config at {}, skipping", config_path.display());
            return Ok(FormatReport::default());
        }

        let config = TemplateConfig::load(&config_path)?;
        let mut report = FormatReport::default();

        for (file, rules) in &config.modify_files {
            let path = work_root.join(file);
            apply(&path, &mut report, |text| replace_lines(text, rules))?;
        }

        for (file, blocks) in &config.modify_mul_line_files {
            let path = work_root.join(file);
            apply(&path, &mut report, |text| replace_blocks(text, blocks))?;
        }

        Ok(report)
    }
}

fn apply(
    path: &Path,
    report: &mut FormatReport,
    edit: impl FnOnce(&str) -> String,
) -> Result<()> {
    if !path.is_file() {
        log::warn!("Template target {} does not exist, skipping", path.display());
        report.missing.push(path.to_path_buf());
        return Ok(());
    }

    let original = std::fs::read_to_string(path)?;
    let updated = edit(&original);
    if updated != original {
        std::fs::write(path, updated)?;
        if !report.modified.iter().any(|p| p == path) {
            report.modified.push(path.to_path_buf());
        }
    }
    Ok(())
}

/// Replace each line containing a search key with its replacement, keeping
/// the original line ending.
fn replace_lines(text: &str, rules: &[(String, String)]) -> String {
    let mut out = String::with_capacity(text.len());

    for line in text.split_inclusive('\n') {
        let (body, ending) = match line.strip_suffix("\r\n") {
            Some(body) => (body, "\r\n"),
            None => match line.strip_suffix('\n') {
                Some(body) => (body, "\n"),
                None => (line, ""),
            },
        };

        match rules.iter().find(|(search, _)| body.contains(search.as_str())) {
            Some((_, replacement)) => {
                out.push_str(replacement);
                out.push_str(ending);
            }
            None => out.push_str(line),
        }
    }

    out
}

fn replace_blocks(text: &str, blocks: &[BlockReplacement]) -> String {
    blocks.iter().fold(text.to_string(), |acc, block| {
        if block.search.is_empty() {
            acc
        } else {
            acc.replace(&block.search, &block.replace)
        }
    })
}
