mod cache;
mod criteria;
mod error;
mod printer;
mod project;
mod runner;

pub use cache::PullRequestStateCache;
pub use criteria::{Decision, apply_criteria, apply_max};
pub use error::{CriteriaError, Result};
pub use printer::{Printer, format_bytes};
pub use project::{
    BranchBucket, Project, PullRequestBucket, builds_to_projects, newest_first_pinned_ahead,
};
pub use runner::{PollingReaper, RunSummary};
