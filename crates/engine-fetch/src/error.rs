use std::path::PathBuf;

use thiserror::Error;

use crate::http::HttpError;

#[derive(Error, Debug)]
pub enum InstallError {
    // Descriptor errors
    #[error("Could not find ({})", path.display())]
    DescriptorNotFound { path: PathBuf },

    #[error("Failed to parse {}: {source}", path.display())]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid descriptor: {message}")]
    InvalidDescriptor { message: String },

    // Network errors
    #[error(transparent)]
    Http(#[from] HttpError),

    // Archive errors
    #[error("{} is not a zip file (gave up after {attempts} attempt(s))", path.display())]
    InvalidArchive { path: PathBuf, attempts: u32 },

    #[error("Failed to read zip entry: {0}")]
    Zip(#[from] zip::result::ZipError),

    // Relocation errors
    #[error("Expected staged directory is missing: {}", path.display())]
    MissingStagedDir { path: PathBuf },

    #[error("Failed to copy {} to {}: {reason}", from.display(), to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("Cannot {stage}: {message}")]
    StagePrecondition { stage: &'static str, message: String },

    // Template errors
    #[error("Failed to parse template config {}: {source}", path.display())]
    TemplateConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // Prompt errors
    #[error("Prompt failed: {0}")]
    Prompt(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InstallError>;
