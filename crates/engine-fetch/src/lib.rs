pub mod archive;
pub mod descriptor;
pub mod error;
pub mod format;
pub mod http;
pub mod installer;
pub mod layout;
pub mod progress;
pub mod relocate;
pub mod retention;

pub use error::{InstallError, Result};
pub use archive::{ArchiveExtractor, ExtractSummary};
pub use descriptor::Descriptor;
pub use format::{FormatReport, NoopFormatter, ProjectFormatter, TemplateFormatter};
pub use installer::{Installer, InstallerConfig, RunOptions, RunOutcome, Stage};
pub use layout::{InstallLayout, ENGINE_DIR_NAME};
pub use relocate::{Relocation, RelocationPlan, RelocationReport};
pub use retention::{ArchiveRetention, FixedAnswer, RetentionPrompt};
