//! Download progress reporting.

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Total to display for a download: the server's Content-Length when present,
/// otherwise the size recorded in the descriptor. Display only.
pub fn resolve_total(content_length: Option<u64>, fallback: u64) -> u64 {
    match content_length {
        Some(len) if len > 0 => len,
        _ => fallback,
    }
}

/// Progress bar for a single archive download
pub struct DownloadProgress {
    bar: ProgressBar,
    fallback_total: u64,
    total_known: bool,
}

impl DownloadProgress {
    /// Create a progress reporter. `fallback_total` is used when the server
    /// does not send a Content-Length header.
    pub fn new(name: &str, fallback_total: u64, enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::with_draw_target(Some(fallback_total), ProgressDrawTarget::stderr())
        } else {
            ProgressBar::hidden()
        };

        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                     {bytes}/{total_bytes} {percent:>3}% {bytes_per_sec} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_message(name.to_string());
        if enabled {
            bar.enable_steady_tick(Duration::from_millis(100));
        }

        Self {
            bar,
            fallback_total,
            total_known: false,
        }
    }

    /// Record the cumulative byte count after a chunk
    pub fn update(&mut self, downloaded: u64, content_length: Option<u64>) {
        if !self.total_known {
            self.total_known = true;
            if content_length.is_none() {
                self.bar.suspend(|| {
                    eprintln!(
                        "{} Couldn't grab the file size from remote, using 'zip_file_size' from the descriptor",
                        style("==> WARNING:").yellow().bold()
                    );
                });
            }
            self.bar
                .set_length(resolve_total(content_length, self.fallback_total));
        }

        // The fallback is only an estimate; never let the bar overflow it.
        if downloaded > self.total() {
            self.bar.set_length(downloaded);
        }
        self.bar.set_position(downloaded);
    }

    /// Total currently displayed
    pub fn total(&self) -> u64 {
        self.bar.length().unwrap_or(self.fallback_total)
    }

    /// Bytes reported so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

/// Helper to format bytes for display
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_total() {
        assert_eq!(resolve_total(Some(1000), 50), 1000);
        assert_eq!(resolve_total(None, 50), 50);
        assert_eq!(resolve_total(Some(0), 50), 50);
    }

    #[test]
    fn test_fallback_total_displayed_without_content_length() {
        let mut progress = DownloadProgress::new("engine.zip", 4096, false);
        progress.update(1024, None);
        assert_eq!(progress.total(), 4096);
        assert_eq!(progress.position(), 1024);
    }

    #[test]
    fn test_server_length_wins() {
        let mut progress = DownloadProgress::new("engine.zip", 4096, false);
        progress.update(10, Some(20));
        assert_eq!(progress.total(), 20);
    }

    #[test]
    fn test_underestimated_fallback_grows() {
        let mut progress = DownloadProgress::new("engine.zip", 100, false);
        progress.update(80, None);
        progress.update(150, None);
        assert_eq!(progress.total(), 150);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }
}
