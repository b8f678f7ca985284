use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/reaper/reaper.toml";
pub const DEFAULT_DATA_DIRECTORY: &str = "/var/lib/reaper/db";
pub const DEFAULT_CONTAINER_MANAGER_URL: &str = "http://localhost:3020";
pub const DEFAULT_API_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: u16 = 3040;

/// Gigabytes an organization may use when its subscription has no override.
pub const DEFAULT_DISK_SPACE_LIMIT: i64 = 1;
pub const DEFAULT_PER_BRANCH_BUILD_LIMIT: i64 = 1;

/// A limit of -1 turns the policy off.
pub const LIMIT_DISABLED: i64 = -1;

pub const DEFAULT_OPEN_PR_MAX: i64 = 1;
pub const DEFAULT_CLOSED_PR_MAX: i64 = 0;

pub const DEFAULT_PR_STATE_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const EVENT_CHANNEL_CAPACITY: usize = 100;

pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);
