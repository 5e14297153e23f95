//! Elasticsearch document store sink.
//!
//! One document per scan ID; each plugin upserts its own
//! `plugins.<category>.<name>` sub-object so results from several plugins
//! accumulate on the same document.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::json;
use url::Url;

use crate::error::{Result, WindefError};
use crate::result::{ScanResult, StoreRecord};

const DEFAULT_PORT: u16 = 9200;

pub struct DocumentStore {
    client: Client,
    base: Url,
    index: String,
}

impl DocumentStore {
    /// Connect to `address` and make sure `index` exists.
    ///
    /// A bare host (`elasticsearch`) is taken as `http://elasticsearch:9200`.
    pub async fn connect(address: &str, index: &str) -> Result<Self> {
        let store = Self {
            client: Client::builder()
                .user_agent(concat!("windef/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(30))
                .build()?,
            base: parse_address(address)?,
            index: index.to_string(),
        };
        store.ensure_index().await?;
        Ok(store)
    }

    async fn ensure_index(&self) -> Result<()> {
        let url = self.url(&[&self.index])?;
        let status = self.client.head(url.clone()).send().await?.status();
        if status.is_success() {
            return Ok(());
        }
        if status != StatusCode::NOT_FOUND {
            return Err(store_error(format!("index check returned {status}")));
        }

        let resp = self.client.put(url).send().await?;
        let status = resp.status();
        if status.is_success() {
            tracing::info!(index = %self.index, "created document store index");
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        // Another plugin may have created it in the meantime.
        if status == StatusCode::BAD_REQUEST && body.contains("resource_already_exists_exception") {
            return Ok(());
        }
        Err(store_error(format!("index creation returned {status}: {body}")))
    }

    /// Upsert this plugin's result onto the scan document `record.id`.
    pub async fn write(&self, record: &StoreRecord<'_>) -> Result<()> {
        let url = self.url(&[&self.index, "_update", record.id])?;
        let plugins = json!({ record.category: { record.name: record.data } });
        let body = json!({
            "doc": { "plugins": plugins },
            "upsert": {
                "id": record.id,
                "scan_date": chrono::Utc::now().to_rfc3339(),
                "plugins": plugins,
            },
        });

        let resp = self.client.post(url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(store_error(format!("write returned {status}: {body}")));
        }
        tracing::debug!(id = record.id, index = %self.index, "stored scan result");
        Ok(())
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| WindefError::Config(format!("invalid store address: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Convenience for the single-shot path: connect, then write one result.
pub async fn store_result(address: &str, index: &str, id: &str, result: &ScanResult) -> Result<()> {
    let store = DocumentStore::connect(address, index).await?;
    store.write(&StoreRecord::new(id, result)).await
}

fn parse_address(address: &str) -> Result<Url> {
    let address = address.trim();
    if address.contains("://") {
        return Url::parse(address)
            .map_err(|e| WindefError::Config(format!("invalid store address {address:?}: {e}")));
    }
    let mut url = Url::parse(&format!("http://{address}"))
        .map_err(|e| WindefError::Config(format!("invalid store address {address:?}: {e}")))?;
    if url.port().is_none() {
        url.set_port(Some(DEFAULT_PORT))
            .map_err(|_| WindefError::Config(format!("invalid store address {address:?}")))?;
    }
    Ok(url)
}

fn store_error(message: String) -> WindefError {
    WindefError::sink("elasticsearch", message)
}
