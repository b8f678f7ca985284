use entity::{Build, LimitRule};
use reaper_config::constants::LIMIT_DISABLED;
use reaper_config::{ConfigError, ReaperConfig};

/// Process-wide limits used when an organization has no override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub disk_space: i64,
    pub per_branch_build_limit: i64,
}

impl Limits {
    pub fn from_config(config: &ReaperConfig) -> Self {
        Self {
            disk_space: config.default_disk_space_limit,
            per_branch_build_limit: config.per_branch_build_limit,
        }
    }

    pub fn default_for(&self, rule: LimitRule) -> i64 {
        match rule {
            LimitRule::DiskSpace => self.disk_space,
            LimitRule::PerBranchBuildLimit => self.per_branch_build_limit,
        }
    }

    /// The organization's integer override for `rule`, else the default.
    pub fn resolve_limit(&self, build: &Build, rule: LimitRule) -> Result<i64, ConfigError> {
        let value = build
            .organization_rule(rule)
            .unwrap_or_else(|| self.default_for(rule));

        if value < LIMIT_DISABLED {
            return Err(ConfigError::InvalidLimit {
                rule: rule.as_str().to_string(),
                value,
            });
        }

        Ok(value)
    }

    /// The resolved limit, or `None` when the policy is disabled.
    pub fn enabled_limit(&self, build: &Build, rule: LimitRule) -> Result<Option<u64>, ConfigError> {
        let value = self.resolve_limit(build, rule)?;
        Ok(u64::try_from(value).ok())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::from_config(&ReaperConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn build_with_rules(rules: Value) -> Build {
        serde_json::from_value(json!({
            "id": "b1",
            "project": {
                "id": "p1",
                "organization": { "id": "org-1", "subscription": { "rules": rules } }
            }
        }))
        .unwrap()
    }

    const LIMITS: Limits = Limits {
        disk_space: 20,
        per_branch_build_limit: 2,
    };

    #[test]
    fn test_integer_override_wins() {
        let build = build_with_rules(json!({ "diskSpace": 5, "perBranchBuildLimit": 0 }));
        assert_eq!(LIMITS.resolve_limit(&build, LimitRule::DiskSpace).unwrap(), 5);
        assert_eq!(
            LIMITS
                .resolve_limit(&build, LimitRule::PerBranchBuildLimit)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_malformed_values_fall_back_to_default() {
        for bad in [json!("5"), json!(2.5), Value::Null, json!({ "n": 1 })] {
            let build = build_with_rules(json!({ "diskSpace": bad }));
            assert_eq!(LIMITS.resolve_limit(&build, LimitRule::DiskSpace).unwrap(), 20);
        }
    }

    #[test]
    fn test_missing_organization_uses_default() {
        let build: Build =
            serde_json::from_value(json!({ "id": "b1", "project": { "id": "p1" } })).unwrap();
        assert_eq!(
            LIMITS
                .resolve_limit(&build, LimitRule::PerBranchBuildLimit)
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_disabled_limit() {
        let build = build_with_rules(json!({ "diskSpace": -1 }));
        assert_eq!(LIMITS.enabled_limit(&build, LimitRule::DiskSpace).unwrap(), None);
        assert_eq!(
            LIMITS
                .enabled_limit(&build, LimitRule::PerBranchBuildLimit)
                .unwrap(),
            Some(2)
        );
    }

    #[test]
    fn test_limit_below_disabled_is_config_error() {
        let build = build_with_rules(json!({ "perBranchBuildLimit": -3 }));
        assert!(matches!(
            LIMITS.resolve_limit(&build, LimitRule::PerBranchBuildLimit),
            Err(ConfigError::InvalidLimit { value: -3, .. })
        ));
    }
}
