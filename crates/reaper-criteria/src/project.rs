use crate::cache::PullRequestStateCache;
use entity::{Build, ProjectRef};
use reaper_client::{PullRequestProvider, PullRequestState};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One pull request's builds, newest first with pinned builds ahead.
#[derive(Debug, Clone)]
pub struct PullRequestBucket {
    pub branch: String,
    pub number: Option<u64>,
    pub state: PullRequestState,
    pub disk_usage: u64,
    pub builds: Vec<Build>,
}

#[derive(Debug, Clone)]
pub struct BranchBucket {
    pub branch: String,
    pub builds: Vec<Build>,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub project: ProjectRef,
    pub pull_requests: Vec<PullRequestBucket>,
    pub branches: Vec<BranchBucket>,
}

impl Project {
    fn new(project: ProjectRef) -> Self {
        Self {
            project,
            pull_requests: Vec::new(),
            branches: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.project.id
    }

    fn add(&mut self, build: Build) {
        let branch = build.branch_name().unwrap_or_default().to_string();

        if build.is_pull_request() {
            let bucket = match self.pull_requests.iter().position(|b| b.branch == branch) {
                Some(index) => &mut self.pull_requests[index],
                None => {
                    self.pull_requests.push(PullRequestBucket {
                        branch,
                        number: build.pull_request_number(),
                        state: PullRequestState::Open,
                        disk_usage: 0,
                        builds: Vec::new(),
                    });
                    let last = self.pull_requests.len() - 1;
                    &mut self.pull_requests[last]
                }
            };
            if bucket.number.is_none() {
                bucket.number = build.pull_request_number();
            }
            bucket.disk_usage += build.real_bytes();
            bucket.builds.push(build);
        } else {
            let bucket = match self.branches.iter().position(|b| b.branch == branch) {
                Some(index) => &mut self.branches[index],
                None => {
                    self.branches.push(BranchBucket {
                        branch,
                        builds: Vec::new(),
                    });
                    let last = self.branches.len() - 1;
                    &mut self.branches[last]
                }
            };
            bucket.builds.push(build);
        }
    }

    fn sort_builds(&mut self) {
        for bucket in &mut self.pull_requests {
            bucket.builds.sort_by(newest_first_pinned_ahead);
        }
        for bucket in &mut self.branches {
            bucket.builds.sort_by(newest_first_pinned_ahead);
        }
    }

    /// Looks up each PR bucket's state once through `cache`. Buckets without
    /// a PR number stay open.
    pub async fn resolve_states(
        &mut self,
        provider: &dyn PullRequestProvider,
        cache: &PullRequestStateCache,
    ) {
        for bucket in &mut self.pull_requests {
            bucket.state = match bucket.number {
                Some(number) => cache.resolve(provider, &self.project, number).await,
                None => PullRequestState::Open,
            };
        }
    }
}

/// Groups builds by project, in first-seen order.
pub fn builds_to_projects(builds: Vec<Build>) -> Vec<Project> {
    let mut projects: Vec<Project> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for build in builds {
        let slot = *index.entry(build.project.id.clone()).or_insert_with(|| {
            projects.push(Project::new(build.project.clone()));
            projects.len() - 1
        });
        projects[slot].add(build);
    }

    for project in &mut projects {
        project.sort_builds();
    }

    projects
}

/// Pinned builds first, then descending `createdAt`. A missing timestamp
/// sorts as the oldest.
pub fn newest_first_pinned_ahead(a: &Build, b: &Build) -> Ordering {
    fn date(build: &Build) -> &str {
        if build.created_at.is_empty() {
            "0"
        } else {
            &build.created_at
        }
    }

    b.pinned
        .cmp(&a.pinned)
        .then_with(|| date(b).cmp(date(a)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(id: &str, project: &str, branch: &str, kind: &str, created: &str) -> Build {
        serde_json::from_value(json!({
            "id": id,
            "createdAt": created,
            "project": { "id": project },
            "branch": { "name": branch },
            "pullRequest": { "number": 7 },
            "type": kind,
            "diskSpace": { "realBytes": 10 },
            "container": { "id": format!("c-{id}") }
        }))
        .unwrap()
    }

    #[test]
    fn test_groups_by_project_and_bucket() {
        let projects = builds_to_projects(vec![
            build("1", "p1", "feature", "pull_request", "2016-01-01"),
            build("2", "p2", "main", "branch", "2016-01-02"),
            build("3", "p1", "feature", "pull_request", "2016-01-03"),
            build("4", "p1", "main", "branch", "2016-01-04"),
        ]);

        assert_eq!(projects.len(), 2);
        let p1 = &projects[0];
        assert_eq!(p1.id(), "p1");
        assert_eq!(p1.pull_requests.len(), 1);
        assert_eq!(p1.pull_requests[0].branch, "feature");
        assert_eq!(p1.pull_requests[0].number, Some(7));
        assert_eq!(p1.pull_requests[0].disk_usage, 20);
        assert_eq!(p1.pull_requests[0].state, PullRequestState::Open);
        assert_eq!(p1.branches.len(), 1);
        assert_eq!(projects[1].branches[0].builds[0].id, "2");
    }

    #[test]
    fn test_untyped_builds_are_pull_requests() {
        let mut untyped = build("1", "p1", "feature", "pull_request", "2016-01-01");
        untyped.build_type = None;

        let projects = builds_to_projects(vec![untyped]);
        assert_eq!(projects[0].pull_requests.len(), 1);
        assert!(projects[0].branches.is_empty());
    }

    #[test]
    fn test_branchless_builds_share_empty_bucket() {
        let mut a = build("1", "p1", "x", "branch", "2016-01-01");
        let mut b = build("2", "p1", "y", "branch", "2016-01-02");
        a.branch = None;
        b.branch = None;

        let projects = builds_to_projects(vec![a, b]);
        assert_eq!(projects[0].branches.len(), 1);
        assert_eq!(projects[0].branches[0].branch, "");
        assert_eq!(projects[0].branches[0].builds.len(), 2);
    }

    #[test]
    fn test_buckets_sorted_newest_first_pinned_ahead() {
        let mut pinned = build("old-pinned", "p1", "f", "pull_request", "2016-01-01");
        pinned.pinned = true;
        let mut undated = build("undated", "p1", "f", "pull_request", "");
        undated.created_at.clear();

        let projects = builds_to_projects(vec![
            undated,
            build("mid", "p1", "f", "pull_request", "2016-01-02"),
            pinned,
            build("new", "p1", "f", "pull_request", "2016-01-03"),
        ]);

        let ids: Vec<&str> = projects[0].pull_requests[0]
            .builds
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["old-pinned", "new", "mid", "undated"]);
    }
}
