use crate::cache::PullRequestStateCache;
use crate::criteria::{Decision, apply_criteria};
use crate::error::Result;
use crate::printer::Printer;
use crate::project::builds_to_projects;
use reaper_client::{ContainerManager, PullRequestProvider};
use reaper_config::CriteriaConfig;
use reaper_engine::{ReapExecutor, ReapOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub projects: usize,
    pub removed: usize,
    pub kept: usize,
    pub failed: usize,
}

/// Polling mode: fetch every build, bucket them per project and reap what
/// the criteria reject.
pub struct PollingReaper {
    manager: Arc<dyn ContainerManager>,
    pull_requests: Arc<dyn PullRequestProvider>,
    cache: Arc<PullRequestStateCache>,
    criteria: CriteriaConfig,
    executor: ReapExecutor,
    printer: Printer,
}

impl PollingReaper {
    pub fn new(
        manager: Arc<dyn ContainerManager>,
        pull_requests: Arc<dyn PullRequestProvider>,
        cache: Arc<PullRequestStateCache>,
        criteria: CriteriaConfig,
        executor: ReapExecutor,
        printer: Printer,
    ) -> Self {
        Self {
            manager,
            pull_requests,
            cache,
            criteria,
            executor,
            printer,
        }
    }

    /// Evaluates every project and prints each decision through `emit`.
    pub async fn run(&self, all: bool, mut emit: impl FnMut(String)) -> Result<RunSummary> {
        self.criteria.validate()?;

        let builds = self.manager.list_builds(all).await?;
        info!("Fetched {} builds from the container manager", builds.len());

        let mut projects = builds_to_projects(builds);
        let mut summary = RunSummary {
            projects: projects.len(),
            ..Default::default()
        };
        let mut decisions = Vec::with_capacity(projects.len());

        for project in &mut projects {
            project
                .resolve_states(self.pull_requests.as_ref(), &self.cache)
                .await;
            self.printer.project_lines(project).into_iter().for_each(&mut emit);

            let decision = apply_criteria(project, &self.criteria)?;
            self.printer
                .decision_lines(&decision, self.executor.is_dry_run())
                .into_iter()
                .for_each(&mut emit);
            decisions.push(decision);
        }

        let mut reaped: HashSet<String> = HashSet::new();
        for decision in decisions {
            summary.kept += decision.keep.len();
            self.reap(decision, &mut reaped, &mut summary).await;
        }

        info!(
            "Reap run complete: {} removed, {} kept, {} failed",
            summary.removed, summary.kept, summary.failed
        );

        Ok(summary)
    }

    async fn reap(&self, decision: Decision, reaped: &mut HashSet<String>, summary: &mut RunSummary) {
        for build in decision.remove {
            let Some(container_id) = build.container_id() else {
                continue;
            };
            if !reaped.insert(container_id.to_string()) {
                continue;
            }

            match self.executor.reap(&build).await {
                Ok(ReapOutcome::Skipped) => {}
                Ok(_) => summary.removed += 1,
                Err(e) => {
                    error!("Build {} could not be reaped: {}", build.id, e);
                    summary.failed += 1;
                }
            }
        }
    }
}
