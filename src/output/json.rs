use crate::error::Result;
use crate::result::{PluginResults, ScanResult};

/// Render a result as the compact JSON envelope.
pub fn render(result: &ScanResult) -> Result<String> {
    let envelope = PluginResults::from(result.clone());
    let json = serde_json::to_string(&envelope)?;
    Ok(json)
}
