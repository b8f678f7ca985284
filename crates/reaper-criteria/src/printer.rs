use crate::criteria::Decision;
use crate::project::{BranchBucket, Project, PullRequestBucket};
use entity::Build;
use reaper_config::OutputFormat;
use serde_json::json;

/// Renders projects and decisions as text lines or one JSON object per line.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn project_lines(&self, project: &Project) -> Vec<String> {
        match self.format {
            OutputFormat::Text => {
                let mut lines = vec![format!(
                    "Project {} {} [{}]",
                    project.id(),
                    project.project.slug.as_deref().unwrap_or_default(),
                    project
                        .project
                        .provider
                        .as_ref()
                        .and_then(|p| p.slug.as_deref())
                        .unwrap_or_default()
                )];
                for bucket in &project.pull_requests {
                    lines.extend(pull_request_lines(bucket));
                }
                for bucket in &project.branches {
                    lines.extend(branch_lines(bucket));
                }
                lines
            }
            OutputFormat::Json => {
                let pull_requests: Vec<_> = project
                    .pull_requests
                    .iter()
                    .map(|pr| {
                        json!({
                            "branch": pr.branch,
                            "number": pr.number,
                            "state": pr.state.as_str(),
                            "diskUsage": pr.disk_usage,
                            "builds": pr.builds.iter().map(|b| &b.id).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                let branches: Vec<_> = project
                    .branches
                    .iter()
                    .map(|branch| {
                        json!({
                            "branch": branch.branch,
                            "builds": branch.builds.iter().map(|b| &b.id).collect::<Vec<_>>(),
                        })
                    })
                    .collect();

                vec![
                    json!({
                        "project": project.id(),
                        "slug": project.project.slug,
                        "pullRequests": pull_requests,
                        "branches": branches,
                    })
                    .to_string(),
                ]
            }
        }
    }

    /// One line per build in the decision, removals first.
    pub fn decision_lines(&self, decision: &Decision, dry_run: bool) -> Vec<String> {
        let removals = decision.remove.iter().map(|b| (b, "remove"));
        let keeps = decision.keep.iter().map(|b| (b, "keep"));

        removals
            .chain(keeps)
            .map(|(build, action)| self.decision_line(build, action, dry_run))
            .collect()
    }

    fn decision_line(&self, build: &Build, action: &str, dry_run: bool) -> String {
        let container = build.container_id().unwrap_or_default();
        let reason = build.reaped_reason.unwrap_or_default();

        match self.format {
            OutputFormat::Text => {
                let prefix = if dry_run { "[dry run] " } else { "" };
                if action == "remove" {
                    format!(
                        "{prefix}Remove container {container} of build {} because: {}",
                        build.id,
                        reason.description()
                    )
                } else {
                    format!("{prefix}Keep container {container} of build {}", build.id)
                }
            }
            OutputFormat::Json => {
                let mut line = json!({
                    "action": action,
                    "build": build.id,
                    "container": container,
                    "dryRun": dry_run,
                });
                if action == "remove" {
                    line["reason"] = json!(reason.code());
                    line["reasonText"] = json!(reason.description());
                }
                line.to_string()
            }
        }
    }
}

fn pull_request_lines(bucket: &PullRequestBucket) -> Vec<String> {
    let mut lines = vec![format!(
        "\tPR {} branch: {} state: {} [{} builds] [total size: {}]",
        bucket
            .number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string()),
        bucket.branch,
        bucket.state,
        bucket.builds.len(),
        format_bytes(bucket.disk_usage)
    )];
    lines.extend(bucket.builds.iter().map(|b| build_line(b, "\t\t")));
    lines
}

fn branch_lines(bucket: &BranchBucket) -> Vec<String> {
    let mut lines = vec![format!(
        "\tBranch {} [{} builds]",
        bucket.branch,
        bucket.builds.len()
    )];
    lines.extend(bucket.builds.iter().map(|b| build_line(b, "\t\t")));
    lines
}

fn build_line(build: &Build, indent: &str) -> String {
    let state = build
        .container
        .as_ref()
        .and_then(|c| c.state.as_deref())
        .unwrap_or("unknown");
    format!(
        "{indent}Build {} {} container: {} size: {}",
        build.id,
        build.created_at,
        state,
        format_bytes(build.real_bytes())
    )
}

/// Binary-unit size with up to two decimals, e.g. `1.5GB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        return format!("{bytes}B");
    }
    let rendered = format!("{value:.2}");
    let rendered = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{rendered}{}", UNITS[unit])
}
