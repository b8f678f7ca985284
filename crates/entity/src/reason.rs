use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a build was selected for removal. Serialized as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "RawReason", into = "u8")]
pub enum ReapedReason {
    #[default]
    Unknown,
    DiskLimit,
    BranchBuilds,
    PrBuilds,
    PrClosed,
    Manual,
}

impl ReapedReason {
    pub const ALL: [ReapedReason; 6] = [
        ReapedReason::Unknown,
        ReapedReason::DiskLimit,
        ReapedReason::BranchBuilds,
        ReapedReason::PrBuilds,
        ReapedReason::PrClosed,
        ReapedReason::Manual,
    ];

    pub fn code(self) -> u8 {
        match self {
            ReapedReason::Unknown => 0,
            ReapedReason::DiskLimit => 1,
            ReapedReason::BranchBuilds => 2,
            ReapedReason::PrBuilds => 3,
            ReapedReason::PrClosed => 4,
            ReapedReason::Manual => 5,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ReapedReason::Unknown => "Unknown reason",
            ReapedReason::DiskLimit => "Organization is over its disk space limit",
            ReapedReason::BranchBuilds => "Too many builds on the branch",
            ReapedReason::PrBuilds => "Too many builds on the pull request",
            ReapedReason::PrClosed => "Pull request is closed",
            ReapedReason::Manual => "Manually reaped",
        }
    }
}

impl From<u8> for ReapedReason {
    fn from(code: u8) -> Self {
        match code {
            1 => ReapedReason::DiskLimit,
            2 => ReapedReason::BranchBuilds,
            3 => ReapedReason::PrBuilds,
            4 => ReapedReason::PrClosed,
            5 => ReapedReason::Manual,
            _ => ReapedReason::Unknown,
        }
    }
}

impl From<ReapedReason> for u8 {
    fn from(reason: ReapedReason) -> Self {
        reason.code()
    }
}

impl fmt::Display for ReapedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

// Older producers wrote `{constant, description}` objects instead of the bare code.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawReason {
    Code(i64),
    Object { constant: i64 },
}

impl From<RawReason> for ReapedReason {
    fn from(raw: RawReason) -> Self {
        let code = match raw {
            RawReason::Code(code) | RawReason::Object { constant: code } => code,
        };
        u8::try_from(code).map(ReapedReason::from).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        let codes: Vec<u8> = ReapedReason::ALL.iter().map(|r| r.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4, 5]);

        for reason in ReapedReason::ALL {
            assert_eq!(ReapedReason::from(reason.code()), reason);
            assert!(!reason.description().is_empty());
        }
    }

    #[test]
    fn test_serializes_as_code() {
        let json = serde_json::to_string(&ReapedReason::PrClosed).unwrap();
        assert_eq!(json, "4");
    }

    #[test]
    fn test_accepts_legacy_object_form() {
        let reason: ReapedReason =
            serde_json::from_str(r#"{"constant": 1, "description": "disk"}"#).unwrap();
        assert_eq!(reason, ReapedReason::DiskLimit);
    }

    #[test]
    fn test_unknown_code_falls_back() {
        let reason: ReapedReason = serde_json::from_str("42").unwrap();
        assert_eq!(reason, ReapedReason::Unknown);

        let reason: ReapedReason = serde_json::from_str("-3").unwrap();
        assert_eq!(reason, ReapedReason::Unknown);
    }
}
