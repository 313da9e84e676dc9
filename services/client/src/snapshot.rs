//! Read-only retrieval of a stored session for display.

use async_trait::async_trait;
use chatwire_core::protocol::SessionSnapshot;
use tracing::{debug, instrument};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Failed to fetch session data ({0})")]
    Status(reqwest::StatusCode),
    #[error("Failed to fetch session data: {0}")]
    Request(#[from] reqwest::Error),
}

/// Anything that can fetch a session snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, url: Url) -> Result<SessionSnapshot, SnapshotError>;
}

/// Fetches snapshots over HTTP. Never retries.
#[derive(Clone, Default)]
pub struct HttpSnapshotSource {
    http: reqwest::Client,
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    #[instrument(name = "snapshot_fetch", skip_all, fields(url = %url))]
    async fn fetch(&self, url: Url) -> Result<SessionSnapshot, SnapshotError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SnapshotError::Status(status));
        }
        let snapshot: SessionSnapshot = response.json().await?;
        debug!(events = snapshot.events.len(), "Fetched session snapshot");
        Ok(snapshot)
    }
}
