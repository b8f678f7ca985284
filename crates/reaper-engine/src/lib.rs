mod consumer;
mod error;
pub mod exclusion;
mod limits;
pub mod order;
mod policy;
mod reap;

pub use consumer::{EventEnvelope, EventOutcome, process_event, run_consumer};
pub use error::{EngineError, Result};
pub use limits::Limits;
pub use order::eviction_order;
pub use policy::{
    EnforcementReport, Policy, PolicyEngine, PolicyOutcome, SkipReason, select_branch_overflow,
    select_disk_overflow,
};
pub use reap::{CandidateReport, ReapExecutor, ReapOutcome};
