use serde::{Deserialize, Serialize};

/// Plugin name used as the JSON envelope key and store record name.
pub const PLUGIN_NAME: &str = "windows-defender";

/// Plugin category in the Malice plugin registry.
pub const PLUGIN_CATEGORY: &str = "av";

/// Outcome of a single scan.
///
/// An uninfected result always carries an empty `result` label. The only
/// constructors are [`ScanResult::clean`] and [`ScanResult::infected`], and
/// deserialization rejects records that break the rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScanResult")]
pub struct ScanResult {
    infected: bool,
    result: String,
    engine: String,
    updated: String,
}

#[derive(Deserialize)]
struct RawScanResult {
    infected: bool,
    #[serde(default)]
    result: String,
    #[serde(default)]
    engine: String,
    #[serde(default)]
    updated: String,
}

impl TryFrom<RawScanResult> for ScanResult {
    type Error = String;

    fn try_from(raw: RawScanResult) -> Result<Self, Self::Error> {
        if !raw.infected && !raw.result.is_empty() {
            return Err(format!(
                "uninfected result must not carry a label, got {:?}",
                raw.result
            ));
        }
        Ok(Self {
            infected: raw.infected,
            result: raw.result,
            engine: raw.engine,
            updated: raw.updated,
        })
    }
}

impl ScanResult {
    pub fn clean(engine: impl Into<String>, updated: impl Into<String>) -> Self {
        Self {
            infected: false,
            result: String::new(),
            engine: engine.into(),
            updated: updated.into(),
        }
    }

    pub fn infected(
        threat: impl Into<String>,
        engine: impl Into<String>,
        updated: impl Into<String>,
    ) -> Self {
        Self {
            infected: true,
            result: threat.into(),
            engine: engine.into(),
            updated: updated.into(),
        }
    }

    pub fn is_infected(&self) -> bool {
        self.infected
    }

    /// Detection name, empty when clean.
    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Definition update date (`YYYYMMDD`), possibly empty.
    pub fn updated(&self) -> &str {
        &self.updated
    }
}

/// JSON envelope emitted on stdout, to the webhook and by the web service:
/// `{"windows-defender": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginResults {
    #[serde(rename = "windows-defender")]
    pub results: ScanResult,
}

impl From<ScanResult> for PluginResults {
    fn from(results: ScanResult) -> Self {
        Self { results }
    }
}

/// Record written to the document store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreRecord<'a> {
    pub id: &'a str,
    pub name: &'static str,
    pub category: &'static str,
    pub data: &'a ScanResult,
}

impl<'a> StoreRecord<'a> {
    pub fn new(id: &'a str, data: &'a ScanResult) -> Self {
        Self {
            id,
            name: PLUGIN_NAME,
            category: PLUGIN_CATEGORY,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn envelope_matches_plugin_wire_shape() {
        let envelope = PluginResults::from(ScanResult::infected(
            "Virus:DOS/EICAR_Test_File",
            "1.1.14700.5",
            "20170707",
        ));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "windows-defender": {
                    "infected": true,
                    "result": "Virus:DOS/EICAR_Test_File",
                    "engine": "1.1.14700.5",
                    "updated": "20170707",
                }
            })
        );
    }

    #[test]
    fn clean_result_has_empty_label() {
        let result = ScanResult::clean("", "20170707");
        assert!(!result.is_infected());
        assert_eq!(result.result(), "");
    }

    #[test]
    fn deserialize_rejects_labelled_clean_result() {
        let raw = json!({"infected": false, "result": "Trojan:Win32/Foo", "engine": "", "updated": ""});
        assert!(serde_json::from_value::<ScanResult>(raw).is_err());
    }

    #[test]
    fn deserialize_accepts_envelope() {
        let body = r#"{"windows-defender":{"infected":false,"result":"","engine":"","updated":"20170707"}}"#;
        let envelope: PluginResults = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.results, ScanResult::clean("", "20170707"));
    }

    #[test]
    fn store_record_carries_plugin_identity() {
        let result = ScanResult::clean("", "20170707");
        let value = serde_json::to_value(StoreRecord::new("abc123", &result)).unwrap();
        assert_eq!(value["name"], "windows-defender");
        assert_eq!(value["category"], "av");
        assert_eq!(value["id"], "abc123");
        assert_eq!(value["data"]["infected"], false);
    }
}
