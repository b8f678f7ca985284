//! Composite index keys.
//!
//! Every build is written under each key that applies to it, all mapping to
//! the same JSON record. Timestamps are ISO-8601 so a prefix scan over any
//! index returns builds in creation order.

use entity::Build;
use redb::TableDefinition;

/// All index keys live in one table of `&str` keys to JSON values.
pub const BUILDS: TableDefinition<&str, &[u8]> = TableDefinition::new("builds");

pub const SEPARATOR: &str = "!!";

pub const BUILD: &str = "build";
pub const BUILD_DATE: &str = "build_date";
pub const ORGANIZATION_BUILD: &str = "organization_build";
pub const PROJECT_BRANCH_BUILD: &str = "project_branch_build";

pub fn build_key(id: &str) -> String {
    format!("{BUILD}!!{id}")
}

pub fn build_date_key(build: &Build) -> String {
    format!("{BUILD_DATE}!!{}!!{}", build.created_at, build.id)
}

/// Prefix matching every `build!!{id}` record.
pub fn build_prefix() -> String {
    format!("{BUILD}{SEPARATOR}")
}

pub fn organization_prefix(organization_id: &str) -> String {
    format!("{ORGANIZATION_BUILD}!!{organization_id}!!")
}

pub fn project_branch_prefix(project_id: &str, branch: &str) -> String {
    format!("{PROJECT_BRANCH_BUILD}!!{project_id}!!{branch}!!")
}

/// The full key set for a build, in the order they are written.
pub fn build_keys(build: &Build) -> Vec<String> {
    let mut keys = vec![build_key(&build.id), build_date_key(build)];

    if let Some(organization_id) = build.organization_id() {
        keys.push(format!(
            "{}{}!!{}",
            organization_prefix(organization_id),
            build.created_at,
            build.id
        ));
    }

    if let Some(branch) = build.branch_name() {
        keys.push(format!(
            "{}{}!!{}",
            project_branch_prefix(&build.project.id, branch),
            build.created_at,
            build.id
        ));
    }

    keys
}
