//! Signature update date: marker file with a build-time fallback.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

/// Build timestamp baked in at compile time (`WINDEF_BUILD_TIME=YYYYMMDD`).
pub const BUILD_TIME: &str = match option_env!("WINDEF_BUILD_TIME") {
    Some(t) => t,
    None => "",
};

/// Resolve the definition update date from `marker`.
///
/// A missing marker yields [`BUILD_TIME`] unchanged. Marker contents are
/// normalized to `YYYYMMDD`; anything unreadable or malformed yields `""`.
pub fn resolve_updated_date(marker: &Path) -> String {
    resolve_with_fallback(marker, BUILD_TIME)
}

pub(crate) fn resolve_with_fallback(marker: &Path, fallback: &str) -> String {
    if !marker.exists() {
        return fallback.to_string();
    }
    match std::fs::read_to_string(marker) {
        Ok(raw) => normalize_date(&raw),
        Err(e) => {
            tracing::warn!(marker = %marker.display(), error = %e, "unable to read update marker");
            String::new()
        }
    }
}

/// Normalize `YYYYMMDDHHmm` (or an already short `YYYYMMDD`) into `YYYYMMDD`.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    let date = match raw.len() {
        12 => NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M")
            .ok()
            .map(|dt| dt.date()),
        8 => NaiveDate::parse_from_str(raw, "%Y%m%d").ok(),
        _ => None,
    };
    date.map(|d| d.format("%Y%m%d").to_string())
        .unwrap_or_default()
}
