use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub rules: Rules,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Subscription limit overrides. Values stay raw JSON so a malformed override
/// can be told apart from a missing one and still fall back to the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_space: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_branch_build_limit: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitRule {
    DiskSpace,
    PerBranchBuildLimit,
}

impl LimitRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitRule::DiskSpace => "diskSpace",
            LimitRule::PerBranchBuildLimit => "perBranchBuildLimit",
        }
    }
}

impl fmt::Display for LimitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Rules {
    /// The override for `rule` if it is a well-formed integer.
    pub fn get(&self, rule: LimitRule) -> Option<i64> {
        let value = match rule {
            LimitRule::DiskSpace => self.disk_space.as_ref(),
            LimitRule::PerBranchBuildLimit => self.per_branch_build_limit.as_ref(),
        }?;

        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            _ => None,
        }
    }
}

impl Organization {
    pub fn rule(&self, rule: LimitRule) -> Option<i64> {
        self.subscription.as_ref()?.rules.get(rule)
    }
}
