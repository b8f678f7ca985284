use crate::{Error, Result, http_client, join_segments};
use async_trait::async_trait;
use entity::ProjectRef;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PullRequestState {
    Open,
    Closed,
}

impl PullRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullRequestState::Open => "open",
            PullRequestState::Closed => "closed",
        }
    }
}

impl fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait PullRequestProvider: Send + Sync {
    /// State of pull request `number` on the project's code host. `None`
    /// when the host answers with no recognizable state.
    async fn pull_request_state(
        &self,
        project: &ProjectRef,
        number: u64,
    ) -> Result<Option<PullRequestState>>;
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    #[serde(default)]
    state: Option<String>,
}

/// Queries the code-hosting handler registered for the project's provider
/// type (`github`, `gitlab`, `bitbucket`).
pub struct HttpPullRequestProvider {
    client: reqwest::Client,
    hosts: HashMap<String, String>,
}

impl HttpPullRequestProvider {
    pub fn new(hosts: HashMap<String, String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            hosts,
        })
    }

    fn host_for(&self, project: &ProjectRef) -> Result<&str> {
        let provider_type = project
            .provider
            .as_ref()
            .and_then(|p| p.provider_type.as_deref())
            .unwrap_or_default();

        self.hosts
            .get(provider_type)
            .map(String::as_str)
            .ok_or_else(|| Error::NoHandlerForProvider(provider_type.to_string()))
    }
}

#[async_trait]
impl PullRequestProvider for HttpPullRequestProvider {
    async fn pull_request_state(
        &self,
        project: &ProjectRef,
        number: u64,
    ) -> Result<Option<PullRequestState>> {
        let (Some(owner), Some(repo)) = (project.owner.as_deref(), project.repo.as_deref())
        else {
            return Err(Error::MissingRepository(project.id.clone()));
        };

        let host = self.host_for(project)?;
        let number = number.to_string();
        let mut url = join_segments(host, &["pull-request", owner, repo, &number])?;

        {
            let mut query = url.query_pairs_mut();
            if let Some(auth) = &project.service_auth {
                for (key, value) in auth {
                    query.append_pair(key, &query_value(value));
                }
            }
            if let Some(provider_id) = &project.provider_id {
                query.append_pair("provider_id", &query_value(provider_id));
            }
        }

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

        let parsed: PullRequestResponse = serde_json::from_str(&body)?;
        debug!(
            "Pull request {} of project {} is {:?}",
            number, project.id, parsed.state
        );

        Ok(match parsed.state.as_deref() {
            Some("open") => Some(PullRequestState::Open),
            Some("closed") => Some(PullRequestState::Closed),
            _ => None,
        })
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_value() {
        assert_eq!(query_value(&json!("abc")), "abc");
        assert_eq!(query_value(&json!(42)), "42");
        assert_eq!(query_value(&Value::Null), "");
    }

    #[test]
    fn test_host_lookup_by_provider_type() {
        let provider = HttpPullRequestProvider::new(
            HashMap::from([("github".to_string(), "http://gh.local".to_string())]),
            Duration::from_secs(1),
        )
        .unwrap();

        let project: ProjectRef = serde_json::from_value(json!({
            "id": "p1",
            "provider": { "type": "github" }
        }))
        .unwrap();
        assert_eq!(provider.host_for(&project).unwrap(), "http://gh.local");

        let project: ProjectRef = serde_json::from_value(json!({
            "id": "p2",
            "provider": { "type": "gitea" }
        }))
        .unwrap();
        assert!(matches!(
            provider.host_for(&project),
            Err(Error::NoHandlerForProvider(t)) if t == "gitea"
        ));
    }
}
