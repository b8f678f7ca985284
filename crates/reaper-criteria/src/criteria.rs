use crate::error::Result;
use crate::project::Project;
use entity::{Build, ReapedReason};
use reaper_client::PullRequestState;
use reaper_config::{ConfigError, CriteriaConfig, MaxCriterion};
use std::collections::HashSet;
use tracing::info;

/// Builds to remove and to keep.
#[derive(Debug, Clone, Default)]
pub struct Decision {
    pub remove: Vec<Build>,
    pub keep: Vec<Build>,
}

impl Decision {
    pub fn remove_ids(&self) -> Vec<&str> {
        self.remove.iter().filter_map(Build::container_id).collect()
    }

    pub fn keep_ids(&self) -> Vec<&str> {
        self.keep.iter().filter_map(Build::container_id).collect()
    }

    /// Appends `other`, skipping containers already present.
    fn merge(&mut self, other: Decision) {
        append_unique(&mut self.remove, other.remove);
        append_unique(&mut self.keep, other.keep);
    }

    /// Drops builds without a container and anything also kept from `remove`.
    fn finish(mut self) -> Self {
        self.remove.retain(|b| b.container_id().is_some());
        self.keep.retain(|b| b.container_id().is_some());

        let kept: HashSet<String> = self
            .keep
            .iter()
            .filter_map(|b| b.container_id().map(str::to_string))
            .collect();
        self.remove
            .retain(|b| b.container_id().is_some_and(|id| !kept.contains(id)));
        self
    }
}

fn append_unique(existing: &mut Vec<Build>, incoming: Vec<Build>) {
    let mut seen: HashSet<Option<String>> = existing
        .iter()
        .map(|b| b.container_id().map(str::to_string))
        .collect();

    for build in incoming {
        let key = build.container_id().map(str::to_string);
        if key.is_none() || seen.insert(key) {
            existing.push(build);
        }
    }
}

/// Keeps every pinned build plus the first `max` unpinned builds of a
/// newest-first list. The other unpinned builds are marked with `reason`.
pub fn apply_max(builds: &[Build], max: i64, rule: &str, reason: ReapedReason) -> Result<Decision> {
    let max = usize::try_from(max).map_err(|_| ConfigError::InvalidMax {
        rule: rule.to_string(),
        value: max,
    })?;

    let (pinned, unpinned): (Vec<&Build>, Vec<&Build>) = builds.iter().partition(|b| b.pinned);

    let mut decision = Decision {
        keep: pinned.into_iter().cloned().collect(),
        remove: Vec::new(),
    };
    for (index, build) in unpinned.into_iter().enumerate() {
        if index < max {
            decision.keep.push(build.clone());
        } else {
            decision.remove.push(build.clone().with_reason(reason));
        }
    }

    Ok(decision)
}

/// Applies the PR and branch rules to every bucket of `project`.
pub fn apply_criteria(project: &Project, criteria: &CriteriaConfig) -> Result<Decision> {
    let mut decision = Decision::default();

    if let Some(pull_request) = &criteria.pull_request {
        let rules = [
            (PullRequestState::Open, pull_request.open, ReapedReason::PrBuilds),
            (PullRequestState::Closed, pull_request.closed, ReapedReason::PrClosed),
        ];

        for (state, criterion, reason) in rules {
            let Some(MaxCriterion { max }) = criterion else {
                continue;
            };
            info!("Applying {} PR max: {}", state.as_str().to_uppercase(), max);

            for bucket in project.pull_requests.iter().filter(|b| b.state == state) {
                let rule = format!("pull_request.{state}");
                decision.merge(apply_max(&bucket.builds, max, &rule, reason)?);
            }
        }
    }

    if let Some(MaxCriterion { max }) = criteria.branch {
        info!("Applying branch max: {}", max);

        for bucket in &project.branches {
            decision.merge(apply_max(
                &bucket.builds,
                max,
                "branch",
                ReapedReason::BranchBuilds,
            )?);
        }
    }

    Ok(decision.finish())
}
