use crate::constants;
use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct ReaperConfig {
    #[serde(default = "default_container_manager_url")]
    pub container_manager_url: String,

    /// Base URL of the service answering organization disk-usage queries.
    #[serde(default)]
    pub db_url: Option<String>,

    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,

    #[serde(default = "default_disk_space_limit")]
    pub default_disk_space_limit: i64,

    #[serde(default = "default_per_branch_build_limit")]
    pub per_branch_build_limit: i64,

    #[serde(default)]
    pub limit_rule_exclusions: Vec<ExclusionRule>,

    #[serde(default)]
    pub criteria: Option<CriteriaConfig>,

    #[serde(default)]
    pub code_hosting_handlers: CodeHostingHandlers,

    #[serde(default = "default_pr_state_cache_ttl")]
    pub pr_state_cache_ttl_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    #[serde(default)]
    pub output_format: OutputFormat,

    #[serde(default = "default_api_host")]
    pub api_host: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

/// Builds matching `pattern` are exempt from disk-quota enforcement.
#[derive(Debug, Deserialize, Clone)]
pub struct ExclusionRule {
    pub name: String,
    pub pattern: serde_json::Value,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CriteriaConfig {
    #[serde(default)]
    pub pull_request: Option<PullRequestCriteria>,

    #[serde(default)]
    pub branch: Option<MaxCriterion>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PullRequestCriteria {
    #[serde(default)]
    pub open: Option<MaxCriterion>,

    #[serde(default)]
    pub closed: Option<MaxCriterion>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct MaxCriterion {
    pub max: i64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CodeHostingHandlers {
    #[serde(default)]
    pub github: Option<String>,

    #[serde(default)]
    pub gitlab: Option<String>,

    #[serde(default)]
    pub bitbucket: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::UnknownOutputFormat(other.to_string())),
        }
    }
}

impl CodeHostingHandlers {
    /// Base URL of the PR-state handler for a provider type.
    pub fn host_for(&self, provider_type: &str) -> Option<&str> {
        match provider_type {
            "github" => self.github.as_deref(),
            "gitlab" => self.gitlab.as_deref(),
            "bitbucket" => self.bitbucket.as_deref(),
            _ => None,
        }
    }
}

impl CriteriaConfig {
    /// Open PRs keep one build, closed PRs keep none, branches are unconstrained.
    pub fn standard() -> Self {
        Self {
            pull_request: Some(PullRequestCriteria {
                open: Some(MaxCriterion {
                    max: constants::DEFAULT_OPEN_PR_MAX,
                }),
                closed: Some(MaxCriterion {
                    max: constants::DEFAULT_CLOSED_PR_MAX,
                }),
            }),
            branch: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let pull_request = self.pull_request.as_ref();
        let rules = [
            ("pull_request.open", pull_request.and_then(|p| p.open)),
            ("pull_request.closed", pull_request.and_then(|p| p.closed)),
            ("branch", self.branch),
        ];

        for (rule, criterion) in rules {
            if let Some(criterion) = criterion
                && criterion.max < 0
            {
                return Err(ConfigError::InvalidMax {
                    rule: rule.to_string(),
                    value: criterion.max,
                });
            }
        }

        Ok(())
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            container_manager_url: default_container_manager_url(),
            db_url: None,
            data_directory: default_data_directory(),
            default_disk_space_limit: default_disk_space_limit(),
            per_branch_build_limit: default_per_branch_build_limit(),
            limit_rule_exclusions: Vec::new(),
            criteria: None,
            code_hosting_handlers: CodeHostingHandlers::default(),
            pr_state_cache_ttl_secs: default_pr_state_cache_ttl(),
            http_timeout_secs: default_http_timeout(),
            output_format: OutputFormat::default(),
            api_host: default_api_host(),
            api_port: default_api_port(),
        }
    }
}

impl ReaperConfig {
    /// Configured criteria, or the standard PR criteria when none are set.
    pub fn criteria(&self) -> CriteriaConfig {
        self.criteria.clone().unwrap_or_else(CriteriaConfig::standard)
    }

    pub fn validate(&self) -> Result<()> {
        for (rule, value) in [
            ("default_disk_space_limit", self.default_disk_space_limit),
            ("per_branch_build_limit", self.per_branch_build_limit),
        ] {
            if value < constants::LIMIT_DISABLED {
                return Err(ConfigError::InvalidLimit {
                    rule: rule.to_string(),
                    value,
                });
            }
        }

        if let Some(criteria) = &self.criteria {
            criteria.validate()?;
        }

        Ok(())
    }
}

fn default_container_manager_url() -> String {
    constants::DEFAULT_CONTAINER_MANAGER_URL.to_string()
}

fn default_data_directory() -> PathBuf {
    PathBuf::from(constants::DEFAULT_DATA_DIRECTORY)
}

fn default_disk_space_limit() -> i64 {
    constants::DEFAULT_DISK_SPACE_LIMIT
}

fn default_per_branch_build_limit() -> i64 {
    constants::DEFAULT_PER_BRANCH_BUILD_LIMIT
}

fn default_pr_state_cache_ttl() -> u64 {
    constants::DEFAULT_PR_STATE_CACHE_TTL_SECS
}

fn default_http_timeout() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_api_host() -> String {
    constants::DEFAULT_API_HOST.to_string()
}

fn default_api_port() -> u16 {
    constants::DEFAULT_API_PORT
}

/// Reads and validates `reaper.toml`. A missing file yields the defaults.
pub async fn load_config(path: &Path) -> Result<ReaperConfig> {
    if !path.exists() {
        tracing::info!("No config found at {}, using defaults", path.display());
        return Ok(ReaperConfig::default());
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let config: ReaperConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    config.validate()?;

    Ok(config)
}
