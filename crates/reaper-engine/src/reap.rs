use crate::error::{EngineError, Result};
use chrono::Utc;
use entity::{Build, ReapedReason};
use reaper_client::{ContainerManager, DeleteOutcome};
use reaper_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    /// The container manager deleted the container.
    Reaped,
    /// The container manager answered 404.
    AlreadyAbsent,
    /// The build has no container reference.
    Skipped,
    DryRun,
}

/// The result of reaping one selected build.
#[derive(Debug)]
pub struct CandidateReport {
    pub build_id: String,
    pub container_id: Option<String>,
    pub reason: ReapedReason,
    pub result: Result<ReapOutcome>,
}

impl CandidateReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Deletes containers through the container manager and, once the manager
/// confirms, removes the build from the store.
#[derive(Clone)]
pub struct ReapExecutor {
    manager: Arc<dyn ContainerManager>,
    store: Option<Arc<Store>>,
    dry_run: bool,
}

impl ReapExecutor {
    pub fn new(manager: Arc<dyn ContainerManager>, store: Option<Arc<Store>>) -> Self {
        Self {
            manager,
            store,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub async fn reap(&self, build: &Build) -> Result<ReapOutcome> {
        let reason = build.reaped_reason.unwrap_or_default();

        let Some(container_id) = build.container_id() else {
            error!(
                build_id = %build.id,
                project_id = %build.project.id,
                "Build {} lacks container information, skipping",
                build.id
            );
            return Ok(ReapOutcome::Skipped);
        };

        if self.dry_run {
            info!(
                build_id = %build.id,
                "Dry run: would remove container {} for build {} ({})",
                container_id,
                build.id,
                reason.description()
            );
            return Ok(ReapOutcome::DryRun);
        }

        info!(
            build_id = %build.id,
            project_id = %build.project.id,
            organization_id = build.organization_id().unwrap_or_default(),
            "Reaping build {} and removing container {}",
            build.id,
            container_id
        );

        let outcome = match self
            .manager
            .delete_container(container_id, reason, Utc::now())
            .await
        {
            Ok(DeleteOutcome::Deleted) => ReapOutcome::Reaped,
            Ok(DeleteOutcome::AlreadyAbsent) => {
                warn!(
                    build_id = %build.id,
                    "Container {} was not found, assuming build {} was already reaped",
                    container_id,
                    build.id
                );
                ReapOutcome::AlreadyAbsent
            }
            Err(e) => {
                error!(
                    build_id = %build.id,
                    "Container manager could not reap build {}: {}",
                    build.id,
                    e
                );
                return Err(EngineError::Transport(e));
            }
        };

        if let Some(store) = &self.store {
            store.builds().delete(build).await?;
        }

        info!(
            build_id = %build.id,
            "Removed container {} for build {} because: {}",
            container_id,
            build.id,
            reason.description()
        );

        Ok(outcome)
    }

    /// Reaps every build concurrently. Reports come back in input order and
    /// one failure never stops the others.
    pub async fn reap_all(&self, builds: Vec<Build>) -> Vec<CandidateReport> {
        let mut tasks = JoinSet::new();
        let mut pending = HashMap::new();

        for (index, build) in builds.into_iter().enumerate() {
            let executor = self.clone();
            let report = CandidateReport {
                build_id: build.id.clone(),
                container_id: build.container_id().map(str::to_string),
                reason: build.reaped_reason.unwrap_or_default(),
                result: Ok(ReapOutcome::Skipped),
            };

            let handle = tasks.spawn(async move { executor.reap(&build).await });
            pending.insert(handle.id(), (index, report));
        }

        let mut reports = Vec::with_capacity(pending.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(e) => {
                    error!("Reap task failed: {}", e);
                    (e.id(), Err(EngineError::Task(e)))
                }
            };

            if let Some((index, mut report)) = pending.remove(&id) {
                report.result = result;
                reports.push((index, report));
            }
        }

        reports.sort_by_key(|(index, _)| *index);
        reports.into_iter().map(|(_, report)| report).collect()
    }
}
