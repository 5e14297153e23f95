//! Runs the external scanner binary with a deadline.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::ScannerConfig;
use crate::error::{Result, WindefError};
use crate::parser;
use crate::result::ScanResult;
use crate::updated;

/// Handle on the installed scanner.
///
/// The scanner has to be started from its install directory. That
/// directory is set on each child process, so the host process's working
/// directory is never touched and concurrent scans do not interfere.
#[derive(Debug, Clone)]
pub struct Scanner {
    install_dir: PathBuf,
    binary: PathBuf,
    marker_file: PathBuf,
    engine: String,
}

impl Scanner {
    pub fn new(config: &ScannerConfig) -> Self {
        let binary = if config.binary.is_absolute() {
            config.binary.clone()
        } else {
            config.install_dir.join(&config.binary)
        };
        Self {
            install_dir: config.install_dir.clone(),
            binary,
            marker_file: config.marker_file.clone(),
            engine: config.engine.clone(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Scan `path`, killing the scanner if it runs past `timeout`.
    pub async fn scan(&self, path: &Path, timeout: Duration) -> Result<ScanResult> {
        let path = std::path::absolute(path)
            .map_err(|e| WindefError::ScanFailed(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(
            binary = %self.binary.display(),
            cwd = %self.install_dir.display(),
            path = %path.display(),
            "mpclient paths"
        );

        let run = self.run(&path, timeout).await;
        let marker = self.marker_file.clone();
        let updated = tokio::task::spawn_blocking(move || updated::resolve_updated_date(&marker))
            .await
            .unwrap_or_default();
        parser::parse(run, &self.engine, &updated)
    }

    async fn run(&self, path: &Path, timeout: Duration) -> Result<String> {
        let child = Command::new(&self.binary)
            .arg(path)
            .current_dir(&self.install_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                WindefError::ScanFailed(format!(
                    "failed to start {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        // Dropping the child on timeout kills it; tokio reaps it afterwards.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => {
                tracing::warn!(
                    path = %path.display(),
                    timeout_secs = timeout.as_secs(),
                    "scanner exceeded deadline, killed"
                );
                return Err(WindefError::ScanTimeout(timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(WindefError::ScanFailed(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        let mut combined = stdout.into_owned();
        if !stderr.is_empty() {
            combined.push_str(&stderr);
        }
        Ok(combined)
    }
}
