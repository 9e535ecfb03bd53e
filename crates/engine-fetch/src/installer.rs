//! The install pipeline.
//!
//! A run is a fixed sequence of stages: check, clean, fetch, extract,
//! relocate, format, retention. Every stage is also callable on its own so it
//! can be driven and tested in isolation.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveExtractor, ExtractSummary};
use crate::descriptor::Descriptor;
use crate::format::{FormatReport, TemplateFormatter};
use crate::http::{HttpClient, HttpClientConfig};
use crate::layout::InstallLayout;
use crate::progress::{format_bytes, DownloadProgress};
use crate::relocate::{relocate, Relocation, RelocationPlan, RelocationReport};
use crate::retention::{ArchiveRetention, RetentionPrompt};
use crate::{InstallError, Result};

const DEFAULT_MAX_FETCH_ATTEMPTS: u32 = 3;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Check,
    Clean,
    Fetch,
    Extract,
    Relocate,
    Format,
    Retention,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Check => "check",
            Stage::Clean => "clean",
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Relocate => "relocate",
            Stage::Format => "format",
            Stage::Retention => "retention",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn require(stage: Stage, ok: bool, message: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(InstallError::StagePrecondition {
            stage: stage.as_str(),
            message: message(),
        })
    }
}

/// Installer settings that don't come from the descriptor
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    pub http: HttpClientConfig,
    /// Download attempts before a corrupt archive is fatal
    pub max_fetch_attempts: u32,
    /// Draw a progress bar while downloading
    pub progress: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            http: HttpClientConfig::default(),
            max_fetch_attempts: DEFAULT_MAX_FETCH_ATTEMPTS,
            progress: true,
        }
    }
}

/// Per-run switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub retention: ArchiveRetention,
    pub force_update: bool,
    pub download_only: bool,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Archive and engine directory were already present
    UpToDate,
    /// Download-only run finished
    Downloaded { archive: PathBuf },
    /// Engine installed into place
    Installed {
        engine_dir: PathBuf,
        extracted: ExtractSummary,
        relocated: RelocationReport,
        formatted: FormatReport,
        archive_kept: bool,
    },
}

/// Engine archive installer
pub struct Installer {
    descriptor: Descriptor,
    layout: InstallLayout,
    http: HttpClient,
    max_fetch_attempts: u32,
    progress: bool,
}

impl Installer {
    /// Create an installer for an already loaded descriptor
    pub fn new(descriptor: Descriptor, layout: InstallLayout, config: InstallerConfig) -> Result<Self> {
        let http = HttpClient::with_config(config.http).map_err(crate::http::HttpError::from)?;

        Ok(Self {
            descriptor,
            layout,
            http,
            max_fetch_attempts: config.max_fetch_attempts.max(1),
            progress: config.progress,
        })
    }

    /// Load the descriptor and derive the layout.
    ///
    /// Fails before touching the network or the disk if the descriptor is
    /// missing or invalid.
    pub fn load(
        work_root: &Path,
        descriptor_path: &Path,
        archive_dir: &Path,
        config: InstallerConfig,
    ) -> Result<Self> {
        let descriptor = Descriptor::load(descriptor_path)?;
        let layout = InstallLayout::new(work_root, descriptor_path, archive_dir, &descriptor);
        Self::new(descriptor, layout, config)
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    /// False only when both the archive and the engine directory exist.
    /// An unreadable descriptor counts as needing an update.
    pub fn needs_update(&self) -> bool {
        if let Err(e) = Descriptor::load(&self.layout.descriptor_path) {
            log::debug!("Descriptor could not be re-read ({}), update needed", e);
            return true;
        }

        !(self.layout.archive_path.exists() && self.layout.engine_dir.exists())
    }

    /// Download the archive unless it is already on disk.
    ///
    /// Returns whether a download happened.
    pub async fn fetch_archive(&self) -> Result<bool> {
        let archive = &self.layout.archive_path;
        if archive.is_file() {
            log::debug!("{} already present, not downloading", archive.display());
            return Ok(false);
        }

        let url = self.descriptor.archive_url();
        log::info!(
            "Ready to download '{}' from '{}'",
            self.descriptor.archive_file_name(),
            url
        );

        let mut progress = DownloadProgress::new(
            &self.descriptor.archive_file_name(),
            self.descriptor.zip_file_size,
            self.progress,
        );

        let result = self
            .http
            .download(&url, archive, |downloaded, total| {
                progress.update(downloaded, total)
            })
            .await;

        match result {
            Ok(bytes) => {
                progress.finish();
                log::info!("Downloading finished! ({})", format_bytes(bytes));
                Ok(true)
            }
            Err(e) => {
                progress.abandon();
                Err(e.into())
            }
        }
    }

    /// Make sure a valid zip is on disk, deleting and re-downloading a corrupt
    /// one up to the configured number of attempts.
    pub async fn validate_and_maybe_redownload(&self) -> Result<()> {
        let archive = &self.layout.archive_path;

        for attempt in 1..=self.max_fetch_attempts {
            self.fetch_archive().await?;

            if ArchiveExtractor::is_zip(archive) {
                return Ok(());
            }

            log::warn!(
                "Unrecognized zip format from your local '{}' file (attempt {}/{})",
                archive.display(),
                attempt,
                self.max_fetch_attempts
            );
            if archive.is_file() {
                std::fs::remove_file(archive)?;
            }
            if attempt < self.max_fetch_attempts {
                log::info!("Download it from internet again, please wait...");
            }
        }

        Err(InstallError::InvalidArchive {
            path: archive.clone(),
            attempts: self.max_fetch_attempts,
        })
    }

    /// Unpack the archive into `destination`
    pub fn extract(&self, destination: &Path) -> Result<ExtractSummary> {
        let archive = &self.layout.archive_path;
        require(Stage::Extract, archive.is_file(), || {
            format!("archive {} does not exist", archive.display())
        })?;

        log::info!("Extracting files, please wait ...");
        let summary = ArchiveExtractor::extract_zip(archive, destination)?;
        if summary.skipped > 0 {
            log::warn!("Skipped {} unsafe archive entries", summary.skipped);
        }
        log::info!("Extraction done!");
        Ok(summary)
    }

    /// Move the staged tree into `libs/` and apply the descriptor's relocations
    pub fn relocate(&self) -> Result<RelocationReport> {
        let relocations: Vec<Relocation> = self
            .descriptor
            .relocations()
            .map(|(src, parent)| Relocation::new(src, parent))
            .collect();

        log::info!("Copying files...");
        relocate(&RelocationPlan {
            work_root: &self.layout.work_root,
            staging_dir: &self.layout.staging_dir,
            final_parent: &self.layout.libs_dir,
            version: &self.descriptor.version,
            engine_dir: &self.layout.engine_dir,
            relocations: &relocations,
        })
    }

    /// Run the whole pipeline
    pub async fn run(
        &self,
        options: RunOptions,
        formatter: &dyn TemplateFormatter,
        prompt: &dyn RetentionPrompt,
    ) -> Result<RunOutcome> {
        log::debug!("Stage: {}", Stage::Check);
        if !options.force_update && !self.needs_update() {
            log::info!("Not need to update!");
            return Ok(RunOutcome::UpToDate);
        }

        log::debug!("Stage: {}", Stage::Clean);
        remove_dir_if_exists(&self.layout.staging_dir)?;
        remove_dir_if_exists(&self.layout.engine_dir)?;

        log::debug!("Stage: {}", Stage::Fetch);
        self.validate_and_maybe_redownload().await?;

        if options.download_only {
            log::info!("Download ({}) finish!", self.descriptor.archive_file_name());
            return Ok(RunOutcome::Downloaded {
                archive: self.layout.archive_path.clone(),
            });
        }

        log::debug!("Stage: {}", Stage::Extract);
        let extracted = self.extract(&self.layout.staging_dir)?;

        log::debug!("Stage: {}", Stage::Relocate);
        let relocated = self.relocate()?;

        log::info!("Cleaning...");
        remove_dir_if_exists(&self.layout.staging_dir)?;

        log::debug!("Stage: {}", Stage::Format);
        require(Stage::Format, self.layout.engine_dir.is_dir(), || {
            format!("{} was not installed", self.layout.engine_dir.display())
        })?;
        log::info!("Format template!");
        let formatted = formatter.format(&self.layout.work_root)?;

        log::debug!("Stage: {}", Stage::Retention);
        let archive = &self.layout.archive_path;
        let archive_kept = if archive.is_file() {
            let keep = options.retention.should_keep(archive, prompt)?;
            if !keep {
                log::info!("Removing {}", archive.display());
                std::fs::remove_file(archive)?;
            }
            keep
        } else {
            false
        };

        Ok(RunOutcome::Installed {
            engine_dir: self.layout.engine_dir.clone(),
            extracted,
            relocated,
            formatted,
            archive_kept,
        })
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        log::debug!("Removing {}", path.display());
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}
