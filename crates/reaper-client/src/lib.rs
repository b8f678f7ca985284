mod container_manager;
mod disk_usage;
mod error;
mod pull_requests;

pub use container_manager::{ContainerManager, DeleteOutcome, HttpContainerManager};
pub use disk_usage::{DiskUsageProvider, HttpDiskUsageProvider, parse_byte_count};
pub use error::{Error, Result};
pub use pull_requests::{HttpPullRequestProvider, PullRequestProvider, PullRequestState};

use std::time::Duration;

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

pub(crate) fn parse_url(base: &str) -> Result<reqwest::Url> {
    reqwest::Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))
}

/// `base` with `segments` appended as escaped path segments.
pub(crate) fn join_segments(base: &str, segments: &[&str]) -> Result<reqwest::Url> {
    let mut url = parse_url(base)?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
