//! windef: Windows Defender scanning plugin for Malice.
//!
//! Wraps the `mpclient` command-line scanner, normalizes its output into a
//! [`ScanResult`], and publishes it to stdout (JSON or Markdown),
//! Elasticsearch, and a webhook. A small web service exposes the same scan
//! over `POST /scan`.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::time::Duration;
//! use windef::{config::Config, scan_file};
//!
//! # async fn run() -> windef::error::Result<()> {
//! let config = Config::default();
//! let result = scan_file(Path::new("/malware/sample.exe"), &config, Duration::from_secs(60)).await?;
//! println!("infected: {}, threat: {}", result.is_infected(), result.result());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod result;
pub mod scanner;
pub mod updated;
pub mod web;

#[cfg(all(test, unix))]
pub(crate) mod test_support;

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::Config;
use error::{Result, WindefError};
use scanner::Scanner;

pub use result::{PluginResults, ScanResult};

/// Resolve `path` to an absolute path of an existing file.
pub fn resolve_target(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .map_err(|e| WindefError::Config(format!("{}: {}", path.display(), e)))?;
    if !absolute.exists() {
        return Err(WindefError::Config(format!(
            "file not found: {}",
            absolute.display()
        )));
    }
    Ok(absolute)
}

/// Validate `path` and scan it with the configured scanner.
pub async fn scan_file(path: &Path, config: &Config, timeout: Duration) -> Result<ScanResult> {
    let target = resolve_target(path)?;
    Scanner::new(&config.scanner).scan(&target, timeout).await
}
