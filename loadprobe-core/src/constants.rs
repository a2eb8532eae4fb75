use std::num::NonZeroUsize;
use std::time::Duration;

/// Base URLs tried, in order, when none are supplied.
pub const DEFAULT_CANDIDATES: [&str; 3] = [
    "http://localhost:8080",
    "http://127.0.0.1:8080",
    "http://[::1]:8080",
];

pub const HEALTH_PATH: &str = "/health";
pub const USERS_PATH: &str = "/users";

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_REQUESTS: usize = 100;
pub const DEFAULT_WORKERS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(5) };

/// Number of completions between two progress lines.
pub const PROGRESS_EVERY: usize = 20;

/// How many creation responses are echoed at debug level.
pub const DEBUG_ECHO_RESPONSES: usize = 3;
