//! Shared fixtures: a tiny archive server and zip builders.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use engine_fetch::{InstallerConfig, RetentionPrompt};
use engine_fetch::format::{FormatReport, TemplateFormatter};
use engine_fetch::http::HttpClientConfig;
use zip::write::SimpleFileOptions;

pub const VERSION: &str = "engine-1.0";

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// Status returned for every request
    pub status: u16,
    /// If false, the body is sent chunked without a Content-Length header
    pub content_length: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            status: 200,
            content_length: true,
        }
    }
}

/// Handle to a background server; counts GET requests.
pub struct ArchiveServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl ArchiveServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serve `body` for every request. The server runs until the process exits.
pub fn serve(body: Vec<u8>) -> ArchiveServer {
    serve_with_options(body, ServerOptions::default())
}

pub fn serve_with_options(body: Vec<u8>, opts: ServerOptions) -> ArchiveServer {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("bind");
    let port = server
        .server_addr()
        .to_ip()
        .expect("tcp listener")
        .port();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    thread::spawn(move || {
        for request in server.incoming_requests() {
            counter.fetch_add(1, Ordering::SeqCst);
            let length = if opts.content_length {
                Some(body.len())
            } else {
                None
            };
            let response = tiny_http::Response::new(
                tiny_http::StatusCode(opts.status),
                Vec::new(),
                Cursor::new(body.clone()),
                length,
                None,
            );
            let _ = request.respond(response);
        }
    });

    ArchiveServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

/// Body reader that hands out `chunk` bytes at a time, sleeping `gap` before each one
struct TrickleReader {
    body: Cursor<Vec<u8>>,
    chunk: usize,
    gap: Duration,
}

impl Read for TrickleReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        thread::sleep(self.gap);
        let len = buf.len().min(self.chunk);
        self.body.read(&mut buf[..len])
    }
}

/// Serve `body` with Content-Length, but slowly: `chunk` bytes every `gap`.
pub fn serve_slowly(body: Vec<u8>, chunk: usize, gap: Duration) -> ArchiveServer {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("bind");
    let port = server
        .server_addr()
        .to_ip()
        .expect("tcp listener")
        .port();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    thread::spawn(move || {
        for request in server.incoming_requests() {
            counter.fetch_add(1, Ordering::SeqCst);
            let reader = TrickleReader {
                body: Cursor::new(body.clone()),
                chunk,
                gap,
            };
            let response = tiny_http::Response::new(
                tiny_http::StatusCode(200),
                Vec::new(),
                reader,
                Some(body.len()),
                None,
            );
            let _ = request.respond(response);
        }
    });

    ArchiveServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

/// Build an in-memory zip. Names ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// The archive used by most tests: an engine tree plus a relocatable `foo/`
pub fn engine_zip() -> Vec<u8> {
    zip_bytes(&[
        ("engine-1.0/", b""),
        ("engine-1.0/cocos/cocos2d.h", b"#pragma once\n"),
        ("engine-1.0/README.md", b"engine"),
        ("foo/", b""),
        ("foo/tool.py", b"print('tool')\n"),
    ])
}

/// Write `libs/config.json` under `root`
pub fn write_descriptor(root: &Path, base_url: &str, move_dirs: Option<&str>) -> PathBuf {
    let libs = root.join("libs");
    std::fs::create_dir_all(&libs).unwrap();
    let moves = move_dirs
        .map(|m| format!(r#", "move_dirs": {}"#, m))
        .unwrap_or_default();
    let path = libs.join("config.json");
    std::fs::write(
        &path,
        format!(
            r#"{{"version": "{}", "downloadUrl": "{}", "zip_file_size": "1024"{}}}"#,
            VERSION, base_url, moves
        ),
    )
    .unwrap();
    path
}

pub fn quiet_config(max_fetch_attempts: u32) -> InstallerConfig {
    InstallerConfig {
        http: HttpClientConfig::new()
            .with_max_retries(0)
            .with_retry_delay(std::time::Duration::from_millis(10)),
        max_fetch_attempts,
        progress: false,
    }
}

/// Formatter that only counts how often it ran
#[derive(Default)]
pub struct CountingFormatter {
    calls: AtomicUsize,
}

impl CountingFormatter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TemplateFormatter for CountingFormatter {
    fn format(&self, _work_root: &Path) -> engine_fetch::Result<FormatReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FormatReport::default())
    }
}

/// Prompt that fails the test if it is consulted
pub struct NeverAsked;

impl RetentionPrompt for NeverAsked {
    fn ask_keep(&self, archive: &Path) -> engine_fetch::Result<String> {
        panic!("unexpected prompt for {}", archive.display());
    }
}
