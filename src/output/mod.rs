pub mod json;
pub mod markdown;
pub mod store;
pub mod webhook;

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, WindefError};
use crate::result::ScanResult;

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    Json,
    Table,
}

/// Render a result for the console.
pub fn render(result: &ScanResult, format: ConsoleFormat) -> Result<String> {
    match format {
        ConsoleFormat::Json => json::render(result),
        ConsoleFormat::Table => Ok(markdown::render(result)),
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub address: String,
    pub index: String,
}

#[derive(Debug, Clone)]
pub struct WebhookOptions {
    pub endpoint: String,
    pub proxy: Option<String>,
    pub timeout: Duration,
}

/// Which sinks receive a finished result.
#[derive(Debug, Clone)]
pub struct SinkOptions {
    pub console: ConsoleFormat,
    pub store: Option<StoreOptions>,
    pub webhook: Option<WebhookOptions>,
    /// Overrides the content hash as scan ID.
    pub scan_id: Option<String>,
}

impl SinkOptions {
    fn needs_scan_id(&self) -> bool {
        self.store.is_some() || self.webhook.is_some()
    }
}

/// Scan ID for `path`: the override when set, else SHA-256 of the file.
pub fn scan_id(override_id: Option<&str>, path: &Path) -> Result<String> {
    if let Some(id) = override_id.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Send `result` to every enabled sink.
///
/// Sinks are isolated: each one runs even if an earlier one failed. All
/// failures are logged and returned so the caller can surface them.
pub async fn publish<W: Write>(
    out: &mut W,
    result: &ScanResult,
    path: &Path,
    options: &SinkOptions,
) -> Vec<WindefError> {
    let mut failures = Vec::new();

    let scan_id = if options.needs_scan_id() {
        match scan_id(options.scan_id.as_deref(), path) {
            Ok(id) => Some(id),
            Err(e) => {
                record_failure(&mut failures, "scan-id", path, e);
                None
            }
        }
    } else {
        None
    };

    if let (Some(store), Some(id)) = (&options.store, &scan_id) {
        if let Err(e) = store::store_result(&store.address, &store.index, id, result).await {
            record_failure(&mut failures, "elasticsearch", path, e);
        }
    }

    let console = render(result, options.console)
        .and_then(|rendered| writeln!(out, "{rendered}").map_err(WindefError::from));
    if let Err(e) = console {
        record_failure(&mut failures, "console", path, e);
    }

    if let (Some(hook), Some(id)) = (&options.webhook, &scan_id) {
        let sent = match webhook::Webhook::new(&hook.endpoint, hook.proxy.as_deref(), hook.timeout) {
            Ok(client) => client.notify(id, result).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            record_failure(&mut failures, "webhook", path, e);
        }
    }

    failures
}

fn record_failure(failures: &mut Vec<WindefError>, sink: &str, path: &Path, error: WindefError) {
    tracing::error!(
        plugin = crate::result::PLUGIN_NAME,
        category = crate::result::PLUGIN_CATEGORY,
        path = %path.display(),
        sink,
        error = %error,
        "sink failed"
    );
    failures.push(error);
}
