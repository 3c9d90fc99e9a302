//! Blocking client for the public exoplanet archive.

use std::sync::Mutex;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use thiserror::Error;

use super::normalize::normalize_batch;
use super::shapes::{RawRecord, SourceKind};
use crate::catalog::{CatalogRecord, RecordSource};
use crate::config::ArchiveSettings;
use crate::http_client::{self, RetryConfig};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Archive request failed: {0}")]
    Transport(String),
    #[error("Archive returned HTTP {0}")]
    Status(u16),
    #[error("Failed to read archive response: {0}")]
    Body(#[from] std::io::Error),
    #[error("Archive response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Archive response is not a JSON array of rows")]
    NotAnArray,
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => FetchError::Status(code),
            ureq::Error::Transport(transport) => FetchError::Transport(transport.to_string()),
        }
    }
}

/// Fetches raw rows for a [`SourceKind`] over HTTP.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    base_url: String,
    agent: ureq::Agent,
    max_response_bytes: usize,
}

impl ArchiveClient {
    pub fn new(settings: &ArchiveSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            agent: http_client::build_agent(settings.timeout()),
            max_response_bytes: settings.max_response_bytes,
        }
    }

    pub fn url_for(&self, kind: SourceKind, rows: usize) -> String {
        format!("{}{}&rows={rows}", self.base_url, kind.endpoint())
    }

    /// Fetch up to `rows` rows, surfacing every failure.
    ///
    /// Individual rows that do not fit the table shape are skipped.
    pub fn try_fetch(&self, kind: SourceKind, rows: usize) -> Result<Vec<RawRecord>, FetchError> {
        let url = self.url_for(kind, rows);
        let response = http_client::retry_with_backoff(
            RetryConfig::ARCHIVE,
            || self.agent.get(&url).call(),
            http_client::is_transient,
        )?;
        let bytes = http_client::read_response_bytes(response, self.max_response_bytes)?;
        let Value::Array(values) = serde_json::from_slice::<Value>(&bytes)? else {
            return Err(FetchError::NotAnArray);
        };
        Ok(parse_rows(kind, values))
    }

    /// Fetch rows, degrading to an empty batch on any failure.
    pub fn fetch(&self, kind: SourceKind, rows: usize) -> Vec<RawRecord> {
        match self.try_fetch(kind, rows) {
            Ok(records) => {
                tracing::info!("Fetched {} {kind} rows from archive", records.len());
                records
            }
            Err(err) => {
                tracing::warn!("Archive fetch for {kind} failed: {err}");
                Vec::new()
            }
        }
    }
}

/// Parse each row independently; rows that fail are logged and skipped.
pub fn parse_rows(kind: SourceKind, values: Vec<Value>) -> Vec<RawRecord> {
    let total = values.len();
    let rows: Vec<RawRecord> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match kind.parse_row(value) {
            Ok(row) => Some(row),
            Err(err) => {
                tracing::debug!("Skipping {kind} row {index}: {err}");
                None
            }
        })
        .collect();
    if rows.len() < total {
        tracing::warn!("Skipped {} malformed {kind} rows", total - rows.len());
    }
    rows
}

/// [`RecordSource`] backed by one archive table.
pub struct ArchiveSource {
    client: ArchiveClient,
    kind: SourceKind,
    label: String,
    rng: Mutex<StdRng>,
}

impl ArchiveSource {
    pub fn new(client: ArchiveClient, kind: SourceKind) -> Self {
        Self {
            client,
            kind,
            label: format!("archive:{kind}"),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }
}

impl RecordSource for ArchiveSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn produce(&self, count: usize) -> Vec<CatalogRecord> {
        let rows = self.client.fetch(self.kind, count);
        let mut rng = self.rng.lock().unwrap_or_else(|err| err.into_inner());
        let (records, summary) = normalize_batch(&rows, &mut *rng);
        if summary.dropped() > 0 {
            tracing::info!(
                "Kept {} of {} {} rows after normalization",
                summary.kept,
                rows.len(),
                self.kind
            );
        }
        records
    }
}
