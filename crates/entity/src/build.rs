use crate::organization::{LimitRule, Organization};
use crate::reason::ReapedReason;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A CI build environment as reported by the container manager.
///
/// Fields the reaper does not interpret are kept in `extra` so a record read
/// back from the store serializes to the same JSON the producer sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,

    pub project: ProjectRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<BranchRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<PullRequestRef>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub build_type: Option<BuildType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub disk_space: DiskSpace,

    #[serde(default, deserialize_with = "null_as_default")]
    pub pinned: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaped_reason: Option<ReapedReason>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderRef>,

    #[serde(default, rename = "provider_id", skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<Value>,

    #[serde(default, rename = "service_auth", skip_serializing_if = "Option::is_none")]
    pub service_auth: Option<BTreeMap<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRef {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Producers send either `{"name": "..."}` or a bare branch string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBranch")]
pub struct BranchRef {
    pub name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBranch {
    Plain(String),
    Object {
        #[serde(default)]
        name: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    },
}

impl From<RawBranch> for BranchRef {
    fn from(raw: RawBranch) -> Self {
        match raw {
            RawBranch::Plain(name) => BranchRef {
                name,
                extra: Map::new(),
            },
            RawBranch::Object { name, extra } => BranchRef {
                name: name.unwrap_or_default(),
                extra,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildType {
    PullRequest,
    Branch,
    Tag,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpace {
    #[serde(default, deserialize_with = "null_as_default")]
    pub real_bytes: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub virtual_bytes: u64,
}

/// Producers send `null` for fields they have no value for yet.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Build {
    /// `project.organizationId`, falling back to the embedded organization's id.
    pub fn organization_id(&self) -> Option<&str> {
        self.project
            .organization_id
            .as_deref()
            .or_else(|| self.project.organization.as_ref()?.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn branch_name(&self) -> Option<&str> {
        self.branch
            .as_ref()
            .map(|b| b.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn container_id(&self) -> Option<&str> {
        self.container.as_ref().map(|c| c.id.as_str())
    }

    pub fn pull_request_number(&self) -> Option<u64> {
        self.pull_request.as_ref()?.number
    }

    pub fn real_bytes(&self) -> u64 {
        self.disk_space.real_bytes
    }

    /// Builds that predate the `type` field were all pull request builds.
    pub fn is_pull_request(&self) -> bool {
        matches!(self.build_type, None | Some(BuildType::PullRequest))
    }

    pub fn organization_rule(&self, rule: LimitRule) -> Option<i64> {
        self.project.organization.as_ref()?.rule(rule)
    }

    pub fn with_reason(mut self, reason: ReapedReason) -> Self {
        self.reaped_reason = Some(reason);
        self
    }
}
