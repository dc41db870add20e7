//! Application-wide constants
//!
//! This module contains all constant values used throughout the grader.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

// =============================================================================
// REDIS DEFAULTS
// =============================================================================

/// Default Redis URL
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Pub/sub channel that pipeline events are published to
pub const DEFAULT_EVENT_CHANNEL: &str = "grader:events";

/// List the worker pops submission jobs from
pub const DEFAULT_JUDGE_QUEUE: &str = "judge_queue";

/// List the worker pops contest finalization jobs from
pub const DEFAULT_FINALIZE_QUEUE: &str = "finalize_queue";

// =============================================================================
// JUDGE DEFAULTS
// =============================================================================

/// Default base URL of the external judge service
pub const DEFAULT_JUDGE_BASE_URL: &str = "http://localhost:2358";

/// Fixed interval between two batch polls
pub const DEFAULT_JUDGE_POLL_INTERVAL_MS: u64 = 1000;

/// Maximum number of batch polls before giving up with a timeout
pub const DEFAULT_JUDGE_MAX_POLLS: u32 = 30;

/// Timeout applied to every single HTTP request to the judge
pub const DEFAULT_JUDGE_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Header carrying the judge authentication token
pub const JUDGE_AUTH_HEADER: &str = "X-Auth-Token";

/// Fields requested when polling a batch
pub const JUDGE_POLL_FIELDS: &str = "token,stdout,stderr,compile_output,status,time,memory";

/// Judge language identifiers
pub mod languages {
    pub const C: (&str, i32) = ("c", 50);
    pub const CPP: (&str, i32) = ("cpp", 54);
    pub const JAVA: (&str, i32) = ("java", 62);
    pub const JAVASCRIPT: (&str, i32) = ("javascript", 63);
    pub const GO: (&str, i32) = ("go", 60);
    pub const PYTHON: (&str, i32) = ("python", 71);
    pub const RUST: (&str, i32) = ("rust", 73);

    /// All supported languages
    pub const ALL: &[(&str, i32)] = &[C, CPP, JAVA, JAVASCRIPT, GO, PYTHON, RUST];

    /// Resolve a language name to the judge language id
    pub fn judge_id(name: &str) -> Option<i32> {
        let name = name.to_ascii_lowercase();
        ALL.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
    }
}

// =============================================================================
// CONTEST SETTINGS
// =============================================================================

/// Penalty for a wrong contest submission (in minutes)
pub const WRONG_SUBMISSION_PENALTY_MINUTES: i64 = 20;

/// Points awarded for a contest problem that does not set its own value
pub const DEFAULT_CONTEST_PROBLEM_POINTS: i32 = 100;

// =============================================================================
// RATING SETTINGS
// =============================================================================

/// Elo K-factor
pub const DEFAULT_RATING_K_FACTOR: f64 = 32.0;

/// Rating assumed for users that have never been rated
pub const DEFAULT_RATING: i32 = 1200;

// =============================================================================
// WORKER DEFAULTS
// =============================================================================

/// Number of submissions judged concurrently by one worker
pub const DEFAULT_WORKER_CONCURRENCY: usize = 4;

/// BRPOP timeout in seconds
pub const QUEUE_POP_TIMEOUT_SECS: f64 = 5.0;

// =============================================================================
// SUBMISSION STATUSES
// =============================================================================

/// Submission status strings as persisted
pub mod statuses {
    pub const PENDING: &str = "PENDING";
    pub const ACCEPTED: &str = "ACCEPTED";
    pub const WRONG_ANSWER: &str = "WRONG_ANSWER";
    pub const TIME_LIMIT_EXCEEDED: &str = "TIME_LIMIT_EXCEEDED";
    pub const RUNTIME_ERROR: &str = "RUNTIME_ERROR";
    pub const COMPILE_ERROR: &str = "COMPILE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

// =============================================================================
// EVENTS
// =============================================================================

/// Event names emitted to the event sink
pub mod events {
    pub const SUBMISSION_UPDATE: &str = "submission:update";
    pub const LEADERBOARD_UPDATE: &str = "contest:leaderboard:update";
    pub const RATING_CHANGED: &str = "rating:changed";
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Maximum source code size in bytes (1 MB)
pub const MAX_SOURCE_CODE_SIZE: usize = 1024 * 1024;
