use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::{Build, ProjectRef, ReapedReason};
use reaper_client::{ContainerManager, DeleteOutcome, PullRequestProvider, PullRequestState};
use reaper_config::{CriteriaConfig, MaxCriterion, OutputFormat, PullRequestCriteria};
use reaper_criteria::{PollingReaper, Printer, PullRequestStateCache, RunSummary};
use reaper_engine::ReapExecutor;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct FakeContainerManager {
    builds: Vec<Build>,
    deleted: Mutex<Vec<(String, ReapedReason)>>,
}

impl FakeContainerManager {
    fn new(builds: Vec<Build>) -> Self {
        Self {
            builds,
            deleted: Mutex::new(Vec::new()),
        }
    }

    fn deleted(&self) -> Vec<(String, ReapedReason)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerManager for FakeContainerManager {
    async fn list_builds(&self, _all: bool) -> reaper_client::Result<Vec<Build>> {
        Ok(self.builds.clone())
    }

    async fn delete_container(
        &self,
        container_id: &str,
        reason: ReapedReason,
        _reaped_at: DateTime<Utc>,
    ) -> reaper_client::Result<DeleteOutcome> {
        self.deleted
            .lock()
            .unwrap()
            .push((container_id.to_string(), reason));
        Ok(DeleteOutcome::Deleted)
    }
}

struct FakePullRequests {
    states: HashMap<u64, PullRequestState>,
    calls: AtomicUsize,
}

impl FakePullRequests {
    fn new(states: &[(u64, PullRequestState)]) -> Self {
        Self {
            states: states.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PullRequestProvider for FakePullRequests {
    async fn pull_request_state(
        &self,
        _project: &ProjectRef,
        number: u64,
    ) -> reaper_client::Result<Option<PullRequestState>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.states.get(&number) {
            Some(state) => Ok(Some(*state)),
            None => Err(reaper_client::Error::NoHandlerForProvider("svn".to_string())),
        }
    }
}

fn pr_build(id: &str, day: u32, branch: &str, number: u64) -> Build {
    serde_json::from_value(json!({
        "id": id,
        "createdAt": format!("2016-03-{day:02}T00:00:00.000Z"),
        "project": { "id": "p1", "owner": "acme", "repo": "widgets" },
        "branch": { "name": branch },
        "pullRequest": { "number": number },
        "type": "pull_request",
        "container": { "id": format!("c-{id}") }
    }))
    .unwrap()
}

fn pr_max(open: i64, closed: i64) -> CriteriaConfig {
    CriteriaConfig {
        pull_request: Some(PullRequestCriteria {
            open: Some(MaxCriterion { max: open }),
            closed: Some(MaxCriterion { max: closed }),
        }),
        branch: None,
    }
}

async fn run(
    builds: Vec<Build>,
    states: &[(u64, PullRequestState)],
    criteria: CriteriaConfig,
    dry_run: bool,
) -> (RunSummary, Vec<(String, ReapedReason)>, Vec<String>) {
    let manager = Arc::new(FakeContainerManager::new(builds));
    let executor = ReapExecutor::new(manager.clone(), None).dry_run(dry_run);
    let reaper = PollingReaper::new(
        manager.clone(),
        Arc::new(FakePullRequests::new(states)),
        Arc::new(PullRequestStateCache::new(Duration::from_secs(60))),
        criteria,
        executor,
        Printer::new(OutputFormat::Text),
    );

    let mut lines = Vec::new();
    let summary = reaper.run(false, |line| lines.push(line)).await.unwrap();
    (summary, manager.deleted(), lines)
}

#[tokio::test]
async fn test_open_pull_request_keeps_newest_two() {
    let builds = vec![
        pr_build("b1", 1, "feature", 5),
        pr_build("b4", 4, "feature", 5),
        pr_build("b2", 2, "feature", 5),
        pr_build("b3", 3, "feature", 5),
    ];

    let (summary, deleted, _) =
        run(builds, &[(5, PullRequestState::Open)], pr_max(2, 0), false).await;

    assert_eq!(
        deleted,
        vec![
            ("c-b2".to_string(), ReapedReason::PrBuilds),
            ("c-b1".to_string(), ReapedReason::PrBuilds),
        ]
    );
    assert_eq!(summary.removed, 2);
    assert_eq!(summary.kept, 2);
}

#[tokio::test]
async fn test_closed_pull_request_uses_closed_reason() {
    let builds = vec![
        pr_build("b1", 1, "feature", 5),
        pr_build("b2", 2, "feature", 5),
        pr_build("b3", 3, "feature", 5),
        pr_build("b4", 4, "feature", 5),
    ];

    let (_, deleted, _) =
        run(builds, &[(5, PullRequestState::Closed)], pr_max(1, 2), false).await;

    assert_eq!(
        deleted,
        vec![
            ("c-b2".to_string(), ReapedReason::PrClosed),
            ("c-b1".to_string(), ReapedReason::PrClosed),
        ]
    );
}

#[tokio::test]
async fn test_failed_state_lookup_assumes_open() {
    let builds = vec![pr_build("b1", 1, "feature", 9), pr_build("b2", 2, "feature", 9)];

    let (_, deleted, lines) = run(builds, &[], CriteriaConfig::standard(), false).await;

    assert_eq!(deleted, vec![("c-b1".to_string(), ReapedReason::PrBuilds)]);
    assert!(lines.iter().any(|l| l.contains("state: open")));
}

#[tokio::test]
async fn test_dry_run_prints_without_deleting() {
    let builds = vec![pr_build("b1", 1, "feature", 5), pr_build("b2", 2, "feature", 5)];

    let (summary, deleted, lines) =
        run(builds, &[(5, PullRequestState::Closed)], pr_max(1, 0), true).await;

    assert!(deleted.is_empty());
    assert_eq!(summary.removed, 2);
    assert_eq!(
        lines
            .iter()
            .filter(|l| l.starts_with("[dry run] Remove container"))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_negative_max_fails_before_fetching() {
    let manager = Arc::new(FakeContainerManager::new(vec![pr_build("b1", 1, "f", 1)]));
    let reaper = PollingReaper::new(
        manager.clone(),
        Arc::new(FakePullRequests::new(&[])),
        Arc::new(PullRequestStateCache::new(Duration::from_secs(60))),
        pr_max(-2, 0),
        ReapExecutor::new(manager.clone(), None),
        Printer::new(OutputFormat::Text),
    );

    let result = reaper.run(false, |_| {}).await;

    assert!(matches!(result, Err(reaper_criteria::CriteriaError::Config(_))));
    assert!(manager.deleted().is_empty());
}

#[tokio::test]
async fn test_state_lookups_are_cached_across_runs() {
    let manager = Arc::new(FakeContainerManager::new(vec![
        pr_build("b1", 1, "a", 1),
        pr_build("b2", 2, "b", 2),
    ]));
    let provider = Arc::new(FakePullRequests::new(&[
        (1, PullRequestState::Open),
        (2, PullRequestState::Open),
    ]));
    let cache = Arc::new(PullRequestStateCache::new(Duration::from_secs(60)));
    let reaper = PollingReaper::new(
        manager.clone(),
        provider.clone(),
        cache.clone(),
        CriteriaConfig::standard(),
        ReapExecutor::new(manager.clone(), None).dry_run(true),
        Printer::new(OutputFormat::Json),
    );

    reaper.run(false, |_| {}).await.unwrap();
    reaper.run(false, |_| {}).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

    cache.invalidate_project("p1").await;
    reaper.run(false, |_| {}).await.unwrap();
    assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
}
