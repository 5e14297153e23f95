//! Converts `mpclient` console output into a [`ScanResult`].
//!
//! A typical infected run looks like:
//!
//! ```text
//! main(): The map file wasn't found, symbols wont be available
//! main(): Scanning /malware/EICAR...
//! EngineScanCallback(): Scanning input
//! EngineScanCallback(): Threat Virus:DOS/EICAR_Test_File identified.
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, WindefError};
use crate::result::ScanResult;

static THREAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\bThreat\s+(\S.*?)\s+identified\b").unwrap());

static ENGINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)\bengine\s+version:?\s*([0-9][0-9.]*[0-9])").unwrap());

/// Turn a subprocess run into a result.
///
/// A failed run is propagated as a scan failure; timeouts pass through
/// as-is. `engine` is used when the output carries no engine version.
pub fn parse(run: Result<String>, engine: &str, updated: &str) -> Result<ScanResult> {
    let stdout = run.map_err(|e| {
        if e.is_scan_failure() {
            e
        } else {
            WindefError::ScanFailed(e.to_string())
        }
    })?;
    Ok(parse_output(&stdout, engine, updated))
}

/// Parse raw scanner output. Never fails: no threat marker means clean.
pub fn parse_output(stdout: &str, engine: &str, updated: &str) -> ScanResult {
    for line in stdout.lines() {
        tracing::debug!(line, "mpclient output");
    }

    let engine = ENGINE_RE
        .captures(stdout)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .unwrap_or(engine);

    match THREAT_RE.captures(stdout).and_then(|cap| cap.get(1)) {
        Some(threat) => ScanResult::infected(threat.as_str(), engine, updated),
        None => ScanResult::clean(engine, updated),
    }
}
