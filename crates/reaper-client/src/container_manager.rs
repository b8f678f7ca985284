use crate::{Error, Result, http_client, join_segments};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::{Build, ReapedReason};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The container manager no longer knows the container.
    AlreadyAbsent,
}

#[async_trait]
pub trait ContainerManager: Send + Sync {
    /// Builds known to the container manager. With `all`, builds whose
    /// containers were already removed are included.
    async fn list_builds(&self, all: bool) -> Result<Vec<Build>>;

    async fn delete_container(
        &self,
        container_id: &str,
        reason: ReapedReason,
        reaped_at: DateTime<Utc>,
    ) -> Result<DeleteOutcome>;
}

pub struct HttpContainerManager {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContainerManager {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ContainerManager for HttpContainerManager {
    async fn list_builds(&self, all: bool) -> Result<Vec<Build>> {
        let mut url = join_segments(&self.base_url, &["builds"])?;
        url.query_pairs_mut()
            .append_pair("all", if all { "true" } else { "false" });

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let items: Vec<serde_json::Value> = serde_json::from_str(&body)?;
        let mut builds = Vec::with_capacity(items.len());

        for item in items {
            match serde_json::from_value::<Build>(item) {
                Ok(build) => builds.push(build),
                Err(e) => warn!("Skipping malformed build from container manager: {}", e),
            }
        }

        debug!("Fetched {} builds from {}", builds.len(), url);
        Ok(builds)
    }

    async fn delete_container(
        &self,
        container_id: &str,
        reason: ReapedReason,
        reaped_at: DateTime<Utc>,
    ) -> Result<DeleteOutcome> {
        let mut url = join_segments(&self.base_url, &["containers", container_id])?;
        url.query_pairs_mut()
            .append_pair("force", "true")
            .append_pair("reason", &reason.code().to_string())
            .append_pair("reasonText", reason.description())
            .append_pair("reapedDate", &reaped_at.timestamp_millis().to_string());

        let response = self.client.delete(url.clone()).send().await?;

        match response.status() {
            StatusCode::OK => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::AlreadyAbsent),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::UnexpectedStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
