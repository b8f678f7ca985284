use crate::{Error, Result, http_client, join_segments};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait DiskUsageProvider: Send + Sync {
    /// Bytes currently used by all of an organization's builds.
    async fn organization_usage(&self, organization_id: &str) -> Result<u64>;
}

pub struct HttpDiskUsageProvider {
    client: reqwest::Client,
    db_url: String,
}

impl HttpDiskUsageProvider {
    pub fn new(db_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            db_url: db_url.into(),
        })
    }
}

#[async_trait]
impl DiskUsageProvider for HttpDiskUsageProvider {
    async fn organization_usage(&self, organization_id: &str) -> Result<u64> {
        let url = join_segments(
            &self.db_url,
            &["organization", organization_id, "disk-usage"],
        )?;

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

        debug!("Disk usage for organization {}: {}", organization_id, body);

        parse_byte_count(&body).ok_or_else(|| Error::InvalidResponse {
            url: url.to_string(),
            reason: format!("no byte count in {body:?}"),
        })
    }
}

/// The byte count in a usage payload: every ASCII digit, concatenated.
///
/// The usage service answers with a quoted number (`"1073741824"`) rather
/// than a JSON number, so the body is scraped instead of decoded.
pub fn parse_byte_count(body: &str) -> Option<u64> {
    let digits: String = body.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_count() {
        assert_eq!(parse_byte_count("\"1073741824\""), Some(1073741824));
    }

    #[test]
    fn test_parse_plain_count() {
        assert_eq!(parse_byte_count("42\n"), Some(42));
    }

    #[test]
    fn test_parse_without_digits() {
        assert_eq!(parse_byte_count("\"\""), None);
        assert_eq!(parse_byte_count("not found"), None);
    }

    #[test]
    fn test_parse_overflow() {
        assert_eq!(parse_byte_count("99999999999999999999999"), None);
    }
}
