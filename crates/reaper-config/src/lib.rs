pub mod config;
pub mod constants;
mod error;

pub use config::{
    CodeHostingHandlers, CriteriaConfig, ExclusionRule, MaxCriterion, OutputFormat,
    PullRequestCriteria, ReaperConfig, load_config,
};
pub use error::{ConfigError, Result};
