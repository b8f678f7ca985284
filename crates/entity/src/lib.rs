pub mod build;
pub mod event;
pub mod organization;
pub mod reason;

pub use build::{
    BranchRef, Build, BuildType, Container, DiskSpace, ProjectRef, ProviderRef, PullRequestRef,
};
pub use event::{EventError, EventKind, LifecycleEvent};
pub use organization::{LimitRule, Organization, Rules, Subscription};
pub use reason::ReapedReason;

/// Bytes in one gibibyte, the unit organization disk quotas are expressed in.
pub const BYTES_IN_GIGABYTE: u64 = 1024 * 1024 * 1024;

pub fn gigabytes_to_bytes(gigabytes: i64) -> u64 {
    u64::try_from(gigabytes)
        .unwrap_or(0)
        .saturating_mul(BYTES_IN_GIGABYTE)
}

pub fn bytes_to_gigabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_IN_GIGABYTE as f64
}
