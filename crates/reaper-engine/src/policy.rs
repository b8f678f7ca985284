use crate::error::Result;
use crate::exclusion::find_exclusion;
use crate::limits::Limits;
use crate::order::{branch_head_ids, eviction_order};
use crate::reap::{CandidateReport, ReapExecutor};
use entity::{Build, LimitRule, ReapedReason, bytes_to_gigabytes, gigabytes_to_bytes};
use reaper_client::DiskUsageProvider;
use reaper_config::{ExclusionRule, ReaperConfig};
use reaper_store::{Store, StoreError};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    BranchLimit,
    DiskQuota,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NoBranch,
    NoOrganization,
    NoUsageProvider,
    /// Matched the named exclusion rule.
    Excluded(String),
}

#[derive(Debug)]
pub enum PolicyOutcome {
    Skipped(SkipReason),
    Enforced(Vec<CandidateReport>),
    /// Candidate selection failed; nothing was reaped.
    Failed(crate::EngineError),
}

impl PolicyOutcome {
    pub fn candidates(&self) -> &[CandidateReport] {
        match self {
            PolicyOutcome::Enforced(candidates) => candidates,
            _ => &[],
        }
    }
}

/// Everything one enforcement pass did for a build.
#[derive(Debug)]
pub struct EnforcementReport {
    pub build_id: String,
    pub branch_limit: PolicyOutcome,
    pub disk_quota: PolicyOutcome,
}

impl EnforcementReport {
    pub fn candidates(&self) -> impl Iterator<Item = &CandidateReport> {
        self.branch_limit
            .candidates()
            .iter()
            .chain(self.disk_quota.candidates())
    }

    /// Ids of builds the pass selected, in selection order. A build picked by
    /// both policies appears twice.
    pub fn selected_ids(&self) -> Vec<&str> {
        self.candidates().map(|c| c.build_id.as_str()).collect()
    }

    pub fn failures(&self) -> usize {
        let policy_failures = [&self.branch_limit, &self.disk_quota]
            .into_iter()
            .filter(|outcome| matches!(outcome, PolicyOutcome::Failed(_)))
            .count();
        policy_failures + self.candidates().filter(|c| !c.succeeded()).count()
    }
}

/// Keeps the newest `limit` unpinned builds of a branch and returns the rest,
/// most expendable first. The branch head is never selected, so a limit of 0
/// still keeps it.
pub fn select_branch_overflow(branch_builds: Vec<Build>, limit: u64) -> Vec<Build> {
    let heads = branch_head_ids(&branch_builds);
    let unpinned: Vec<Build> = eviction_order(branch_builds)
        .into_iter()
        .filter(|build| !build.pinned)
        .collect();

    let keep = usize::try_from(limit).unwrap_or(usize::MAX);
    let excess = unpinned.len().saturating_sub(keep);

    unpinned
        .into_iter()
        .take(excess)
        .filter(|build| !heads.contains(&build.id))
        .map(|build| build.with_reason(ReapedReason::BranchBuilds))
        .collect()
}

/// Walks the unpinned builds from most expendable, subtracting each one's
/// real size, until `usage` fits in `limit_bytes`.
pub fn select_disk_overflow(
    organization_builds: Vec<Build>,
    mut usage: u64,
    limit_bytes: u64,
) -> Vec<Build> {
    let mut selected = Vec::new();

    for build in eviction_order(organization_builds) {
        if usage <= limit_bytes {
            break;
        }
        if build.pinned {
            continue;
        }
        usage = usage.saturating_sub(build.real_bytes());
        selected.push(build.with_reason(ReapedReason::DiskLimit));
    }

    selected
}

/// Applies the per-branch and disk-quota policies to incoming builds.
pub struct PolicyEngine {
    store: Arc<Store>,
    usage: Option<Arc<dyn DiskUsageProvider>>,
    executor: ReapExecutor,
    limits: Limits,
    exclusions: Vec<ExclusionRule>,
}

impl PolicyEngine {
    pub fn new(
        store: Arc<Store>,
        usage: Option<Arc<dyn DiskUsageProvider>>,
        executor: ReapExecutor,
        limits: Limits,
        exclusions: Vec<ExclusionRule>,
    ) -> Self {
        Self {
            store,
            usage,
            executor,
            limits,
            exclusions,
        }
    }

    pub fn from_config(
        config: &ReaperConfig,
        store: Arc<Store>,
        usage: Option<Arc<dyn DiskUsageProvider>>,
        executor: ReapExecutor,
    ) -> Self {
        Self::new(
            store,
            usage,
            executor,
            Limits::from_config(config),
            config.limit_rule_exclusions.clone(),
        )
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Runs both policies for `build` concurrently and waits for every reap
    /// they trigger. Only a limit that fails to resolve aborts the pass.
    pub async fn enforce(&self, build: &Build) -> Result<EnforcementReport> {
        let branch_limit = self
            .limits
            .enabled_limit(build, LimitRule::PerBranchBuildLimit)?;
        let disk_limit = self.limits.enabled_limit(build, LimitRule::DiskSpace)?;

        let mut message = format!("Enforcing limits for {}", build.id);
        if let Some(organization_id) = build.organization_id() {
            message.push_str(&format!(" for organization {organization_id}"));
        }
        info!(
            build_id = %build.id,
            project_id = %build.project.id,
            "{}",
            message
        );

        let (branch_limit, disk_quota) = tokio::join!(
            self.enforce_branch_limit(build, branch_limit),
            self.enforce_disk_quota(build, disk_limit),
        );

        Ok(EnforcementReport {
            build_id: build.id.clone(),
            branch_limit: into_outcome(build, Policy::BranchLimit, branch_limit),
            disk_quota: into_outcome(build, Policy::DiskQuota, disk_quota),
        })
    }

    async fn enforce_branch_limit(
        &self,
        build: &Build,
        limit: Option<u64>,
    ) -> Result<PolicyOutcome> {
        let Some(limit) = limit else {
            return Ok(PolicyOutcome::Skipped(SkipReason::Disabled));
        };
        let Some(branch) = build.branch_name() else {
            return Ok(PolicyOutcome::Skipped(SkipReason::NoBranch));
        };

        let branch_builds = self
            .store
            .builds()
            .list_by_project_branch(&build.project.id, branch)
            .await?;

        let doomed = select_branch_overflow(branch_builds, limit);
        if !doomed.is_empty() {
            info!(
                build_id = %build.id,
                project_id = %build.project.id,
                "Branch {} exceeds its limit of {} builds, reaping {}",
                branch,
                limit,
                doomed.len()
            );
        }

        Ok(PolicyOutcome::Enforced(self.executor.reap_all(doomed).await))
    }

    async fn enforce_disk_quota(&self, build: &Build, limit: Option<u64>) -> Result<PolicyOutcome> {
        if !self.exclusions.is_empty() {
            let value = serde_json::to_value(build).map_err(|source| StoreError::Encode {
                id: build.id.clone(),
                source,
            })?;
            if let Some(rule) = find_exclusion(&value, &self.exclusions) {
                info!(
                    build_id = %build.id,
                    "Build {} was excluded from disk space limits because \"{}\"",
                    build.id,
                    rule.name
                );
                return Ok(PolicyOutcome::Skipped(SkipReason::Excluded(rule.name.clone())));
            }
        }

        let Some(limit) = limit else {
            return Ok(PolicyOutcome::Skipped(SkipReason::Disabled));
        };
        let Some(organization_id) = build.organization_id() else {
            warn!(
                build_id = %build.id,
                "No organization found, skipping disk space enforcement for build {}",
                build.id
            );
            return Ok(PolicyOutcome::Skipped(SkipReason::NoOrganization));
        };
        let Some(usage) = &self.usage else {
            warn!(
                build_id = %build.id,
                "No disk usage provider configured, skipping disk space enforcement"
            );
            return Ok(PolicyOutcome::Skipped(SkipReason::NoUsageProvider));
        };

        let repository = self.store.builds();
        let (organization_builds, current_usage) = tokio::join!(
            repository.list_by_organization(organization_id),
            usage.organization_usage(organization_id),
        );
        let organization_builds = organization_builds?;
        let current_usage = current_usage?;

        let limit_bytes = gigabytes_to_bytes(i64::try_from(limit).unwrap_or(i64::MAX));
        info!(
            build_id = %build.id,
            organization_id = %organization_id,
            "Organization {} is using {:.2}G out of their {}G limit",
            organization_id,
            bytes_to_gigabytes(current_usage),
            limit
        );

        let doomed = select_disk_overflow(organization_builds, current_usage, limit_bytes);

        Ok(PolicyOutcome::Enforced(self.executor.reap_all(doomed).await))
    }
}

fn into_outcome(build: &Build, policy: Policy, result: Result<PolicyOutcome>) -> PolicyOutcome {
    match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(
                build_id = %build.id,
                "An error occurred while enforcing {:?} for {}: {}",
                policy,
                build.id,
                e
            );
            PolicyOutcome::Failed(e)
        }
    }
}
