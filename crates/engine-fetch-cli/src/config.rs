use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_fetch::http::HttpClientConfig;
use engine_fetch::InstallerConfig;

pub const CONFIG_FILE_NAME: &str = "download-engine.toml";

/// Tool configuration file (download-engine.toml)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Network settings
    pub http: HttpSection,

    /// Install settings
    pub install: InstallSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Whole-request deadline in seconds, body included; unset means none
    pub timeout_secs: Option<u64>,

    /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,

    /// Longest silence between two chunks, in seconds
    pub read_timeout_secs: Option<u64>,

    /// Retries for connection errors and 5xx responses
    pub max_retries: Option<u32>,

    /// Proxy URL for all requests
    pub proxy: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// Download attempts before a corrupt archive is fatal
    pub max_fetch_attempts: Option<u32>,

    /// Descriptor path relative to the work root
    pub descriptor: Option<PathBuf>,

    /// Show a progress bar while downloading
    pub progress: Option<bool>,
}

impl ToolConfig {
    /// Load configuration from download-engine.toml, searching upward from the given directory
    pub fn load(start_dir: &Path) -> Result<Option<Self>> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                log::debug!("Using tool config {}", config_path.display());
                let content = std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read {}", config_path.display()))?;
                let config: ToolConfig = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", config_path.display()))?;
                return Ok(Some(config));
            }

            if !current.pop() {
                return Ok(None);
            }
        }
    }

    /// Build the library's installer settings
    pub fn installer_config(&self) -> InstallerConfig {
        let defaults = InstallerConfig::default();
        let mut http = HttpClientConfig::default();

        if let Some(secs) = self.http.timeout_secs {
            http = http.with_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.http.connect_timeout_secs {
            http = http.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.http.read_timeout_secs {
            http = http.with_read_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = self.http.max_retries {
            http = http.with_max_retries(retries);
        }
        if let Some(proxy) = &self.http.proxy {
            http = http.with_proxy(proxy.clone());
        }

        InstallerConfig {
            http,
            max_fetch_attempts: self
                .install
                .max_fetch_attempts
                .unwrap_or(defaults.max_fetch_attempts),
            progress: self.install.progress.unwrap_or(defaults.progress),
        }
    }
}
