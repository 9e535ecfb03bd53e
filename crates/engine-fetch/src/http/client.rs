//! HTTP client used to fetch the engine archive.
//!
//! This module wraps `reqwest` with the behavior the installer needs:
//! - Retries with exponential backoff for transient failures (connection errors, 5xx, 429)
//! - Streaming downloads that write each chunk to disk as it arrives
//! - Connect and per-chunk read timeouts; a whole-request deadline only when asked for
//! - Distinct errors for "not found" and other failing statuses
//!
//! # Examples
//!
//! ```no_run
//! use engine_fetch::http::{HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig::new()
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_max_retries(1);
//! let client = HttpClient::with_config(config)?;
//!
//! client.download(
//!     "https://example.com/engine-1.0.zip",
//!     "engine-1.0.zip".as_ref(),
//!     |downloaded, total| println!("{} / {:?}", downloaded, total),
//! ).await?;
//! # Ok(())
//! # }
//! ```

use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

const DEFAULT_USER_AGENT: &str = concat!("engine-fetch/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Could not find the file from url: '{url}'")]
    NotFound { url: String },

    #[error("Http request failed, error code: {status}, reason: {reason} ({url})")]
    HttpStatus {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("No data received for {}s from {url}", after.as_secs())]
    ReadTimeout { url: String, after: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Max retries exceeded for {url}")]
    MaxRetries { url: String },
}

impl HttpError {
    fn from_status(status: StatusCode, url: &str) -> Self {
        if status == StatusCode::NOT_FOUND {
            HttpError::NotFound {
                url: url.to_string(),
            }
        } else {
            HttpError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
                url: url.to_string(),
            }
        }
    }
}

pub struct HttpClient {
    client: Client,
    user_agent: String,
    max_retries: u32,
    retry_delay: Duration,
    read_timeout: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .user_agent(&config.user_agent);

        // A total deadline also cuts off bodies that are still arriving
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            user_agent: config.user_agent,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
            read_timeout: config.read_timeout,
        })
    }

    /// Perform GET request with automatic retries
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            log::debug!("HTTP GET {} (attempt {})", url, attempt + 1);

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        // Retry on server errors and rate limits
                        log::debug!("HTTP {} {}, will retry", status.as_u16(), url);
                        last_error = Some(HttpError::from_status(status, url));
                    } else {
                        // Client errors are final
                        return Err(HttpError::from_status(status, url));
                    }
                }
                Err(e) => {
                    log::debug!("HTTP GET {} failed: {}", url, e);
                    last_error = Some(HttpError::Request(e));
                }
            }

            if attempt < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = self.retry_delay * 2_u32.pow(attempt);
                tokio::time::sleep(delay).await;
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Err(HttpError::MaxRetries {
                url: url.to_string(),
            }),
        }
    }

    /// Stream `url` into `dest`.
    ///
    /// `progress` is called after every chunk with the cumulative byte count and
    /// the Content-Length reported by the server, if any. A partially written
    /// file is removed when the transfer fails.
    pub async fn download<F>(&self, url: &str, dest: &Path, progress: F) -> Result<u64, HttpError>
    where
        F: FnMut(u64, Option<u64>),
    {
        let response = self.get(url).await?;

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let result = self.write_body(url, response, dest, progress).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    async fn write_body<F>(
        &self,
        url: &str,
        response: Response,
        dest: &Path,
        mut progress: F,
    ) -> Result<u64, HttpError>
    where
        F: FnMut(u64, Option<u64>),
    {
        let total_size = response.content_length();
        let mut file = File::create(dest).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::time::timeout(self.read_timeout, stream.next())
                .await
                .map_err(|_| HttpError::ReadTimeout {
                    url: url.to_string(),
                    after: self.read_timeout,
                })?;

            let Some(chunk) = next else { break };
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            progress(downloaded, total_size);
        }

        file.flush().await?;
        Ok(downloaded)
    }

    /// Get the configured user agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Get the maximum number of retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Deadline for the whole request including the body; none by default
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}
