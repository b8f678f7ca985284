use entity::ProjectRef;
use reaper_client::{PullRequestProvider, PullRequestState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Pull request states keyed by (project id, PR number), each entry valid
/// for `ttl` after it was fetched.
pub struct PullRequestStateCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<(String, u64), (PullRequestState, Instant)>>>,
}

impl PullRequestStateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, project_id: &str, number: u64) -> Option<PullRequestState> {
        let key = (project_id.to_string(), number);
        let entries = self.entries.read().await;
        let (state, fetched_at) = entries.get(&key)?;
        if fetched_at.elapsed() < self.ttl {
            return Some(*state);
        }
        drop(entries);

        let mut entries = self.entries.write().await;
        if entries
            .get(&key)
            .is_some_and(|(_, fetched_at)| fetched_at.elapsed() >= self.ttl)
        {
            entries.remove(&key);
        }
        None
    }

    pub async fn insert(&self, project_id: &str, number: u64, state: PullRequestState) {
        let mut entries = self.entries.write().await;
        entries.insert((project_id.to_string(), number), (state, Instant::now()));
    }

    pub async fn invalidate_project(&self, project_id: &str) {
        let mut entries = self.entries.write().await;
        entries.retain(|(project, _), _| project != project_id);
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        let entries = self.entries.read().await;
        entries.is_empty()
    }

    /// The cached state, or a fresh lookup through `provider`. Failed lookups
    /// and unrecognized states resolve to open and are not cached.
    pub async fn resolve(
        &self,
        provider: &dyn PullRequestProvider,
        project: &ProjectRef,
        number: u64,
    ) -> PullRequestState {
        if let Some(state) = self.get(&project.id, number).await {
            debug!("PR state cache hit for {}#{}", project.id, number);
            return state;
        }

        match provider.pull_request_state(project, number).await {
            Ok(Some(state)) => {
                self.insert(&project.id, number, state).await;
                state
            }
            Ok(None) => {
                warn!(
                    "No state reported for PR {} of project {}, assuming open",
                    number, project.id
                );
                PullRequestState::Open
            }
            Err(e) => {
                warn!(
                    "Failed to fetch PR {} of project {}, assuming open: {}",
                    number, project.id, e
                );
                PullRequestState::Open
            }
        }
    }
}
