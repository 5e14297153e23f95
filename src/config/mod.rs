use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WindefError};

/// Top-level configuration from `windef.toml`.
///
/// Every section is optional; missing keys take the defaults of the
/// stock plugin container (`/loadlibrary`, `/malware`, port 3993).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Layout of the external scanner install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Directory the scanner must be launched from.
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,
    /// Scanner executable, relative to `install_dir` unless absolute.
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// File holding the last signature update date.
    #[serde(default = "default_marker_file")]
    pub marker_file: PathBuf,
    /// Reported when the scanner does not print an engine version.
    #[serde(default)]
    pub engine: String,
}

fn default_install_dir() -> PathBuf {
    PathBuf::from("/loadlibrary")
}

fn default_binary() -> PathBuf {
    PathBuf::from("mpclient")
}

fn default_marker_file() -> PathBuf {
    PathBuf::from("/opt/malice/UPDATED")
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            binary: default_binary(),
            marker_file: default_marker_file(),
            engine: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Uploads are staged here before scanning.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
    /// Optional cap on the request body. Uploads stream to disk, so
    /// unset means unlimited.
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3993))
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("/malware")
}

fn default_scan_timeout_secs() -> u64 {
    60
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            work_dir: default_work_dir(),
            scan_timeout_secs: default_scan_timeout_secs(),
            max_upload_bytes: None,
        }
    }
}

impl WebConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_index")]
    pub index: String,
}

fn default_index() -> String {
    "malice".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            index: default_index(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.web.scan_timeout_secs == 0 {
            return Err(WindefError::Config(
                "web.scan_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.store.index.trim().is_empty() {
            return Err(WindefError::Config("store.index must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_yields_container_defaults() {
        let config = Config::load(Path::new("/nonexistent/windef.toml")).unwrap();
        assert_eq!(config.scanner.install_dir, PathBuf::from("/loadlibrary"));
        assert_eq!(config.scanner.binary, PathBuf::from("mpclient"));
        assert_eq!(config.web.listen.port(), 3993);
        assert_eq!(config.web.scan_timeout(), Duration::from_secs(60));
        assert_eq!(config.store.index, "malice");
        assert_eq!(config.web.max_upload_bytes, None);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windef.toml");
        std::fs::write(
            &path,
            "[scanner]\ninstall_dir = \"/opt/loadlibrary\"\n\n[web]\nlisten = \"127.0.0.1:8080\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.scanner.install_dir, PathBuf::from("/opt/loadlibrary"));
        assert_eq!(config.scanner.marker_file, PathBuf::from("/opt/malice/UPDATED"));
        assert_eq!(config.web.listen.to_string(), "127.0.0.1:8080");
        assert_eq!(config.webhook.timeout(), Duration::from_secs(10));
        assert_eq!(config.web.max_upload_bytes, None);
    }

    #[test]
    fn upload_cap_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windef.toml");
        std::fs::write(&path, "[web]\nmax_upload_bytes = 1048576\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.web.max_upload_bytes, Some(1 << 20));
    }

    #[test]
    fn zero_scan_timeout_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("windef.toml");
        std::fs::write(&path, "[web]\nscan_timeout_secs = 0\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, WindefError::Config(_)));
    }
}
