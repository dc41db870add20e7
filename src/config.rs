//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the worker runs.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONTEST_PROBLEM_POINTS, DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_EVENT_CHANNEL,
    DEFAULT_FINALIZE_QUEUE, DEFAULT_JUDGE_BASE_URL, DEFAULT_JUDGE_MAX_POLLS,
    DEFAULT_JUDGE_POLL_INTERVAL_MS, DEFAULT_JUDGE_QUEUE, DEFAULT_JUDGE_REQUEST_TIMEOUT_SECS,
    DEFAULT_RATING, DEFAULT_RATING_K_FACTOR, DEFAULT_REDIS_URL, DEFAULT_WORKER_CONCURRENCY,
    WRONG_SUBMISSION_PENALTY_MINUTES,
};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub judge: JudgeConfig,
    pub contest: ContestConfig,
    pub rating: RatingConfig,
    pub worker: WorkerConfig,
}

/// Process-level configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub rust_log: String,
    /// Emit JSON log lines instead of the human readable format
    pub json_logs: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub event_channel: String,
}

/// External judge service configuration
#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    /// Fixed delay between two batch polls
    pub poll_interval: Duration,
    /// Hard cap on the number of batch polls
    pub max_polls: u32,
    pub request_timeout: Duration,
}

/// Contest scoring configuration
#[derive(Debug, Clone)]
pub struct ContestConfig {
    pub wrong_penalty_minutes: i64,
    pub default_problem_points: i32,
}

/// Rating engine configuration
#[derive(Debug, Clone)]
pub struct RatingConfig {
    pub k_factor: f64,
    pub default_rating: i32,
}

/// Queue worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub judge_queue: String,
    pub finalize_queue: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            server: ServerConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            redis: RedisConfig::from_env()?,
            judge: JudgeConfig::from_env()?,
            contest: ContestConfig::from_env()?,
            rating: RatingConfig::from_env()?,
            worker: WorkerConfig::from_env()?,
        })
    }
}

/// Read an optional variable, falling back to `default` and failing on unparsable values
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS)?,
        })
    }
}

impl RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            event_channel: env::var("EVENT_CHANNEL")
                .unwrap_or_else(|_| DEFAULT_EVENT_CHANNEL.to_string()),
        })
    }
}

impl JudgeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_polls = parse_var("JUDGE_MAX_POLLS", DEFAULT_JUDGE_MAX_POLLS)?;
        if max_polls == 0 {
            return Err(ConfigError::InvalidValue("JUDGE_MAX_POLLS".to_string()));
        }

        Ok(Self {
            base_url: env::var("JUDGE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_JUDGE_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            auth_token: env::var("JUDGE_AUTH_TOKEN").ok().filter(|t| !t.is_empty()),
            poll_interval: Duration::from_millis(parse_var(
                "JUDGE_POLL_INTERVAL_MS",
                DEFAULT_JUDGE_POLL_INTERVAL_MS,
            )?),
            max_polls,
            request_timeout: Duration::from_secs(parse_var(
                "JUDGE_REQUEST_TIMEOUT_SECS",
                DEFAULT_JUDGE_REQUEST_TIMEOUT_SECS,
            )?),
        })
    }
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_JUDGE_BASE_URL.to_string(),
            auth_token: None,
            poll_interval: Duration::from_millis(DEFAULT_JUDGE_POLL_INTERVAL_MS),
            max_polls: DEFAULT_JUDGE_MAX_POLLS,
            request_timeout: Duration::from_secs(DEFAULT_JUDGE_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ContestConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            wrong_penalty_minutes: parse_var(
                "CONTEST_WRONG_PENALTY_MINUTES",
                WRONG_SUBMISSION_PENALTY_MINUTES,
            )?,
            default_problem_points: parse_var(
                "CONTEST_DEFAULT_POINTS",
                DEFAULT_CONTEST_PROBLEM_POINTS,
            )?,
        })
    }
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            wrong_penalty_minutes: WRONG_SUBMISSION_PENALTY_MINUTES,
            default_problem_points: DEFAULT_CONTEST_PROBLEM_POINTS,
        }
    }
}

impl RatingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            k_factor: parse_var("RATING_K_FACTOR", DEFAULT_RATING_K_FACTOR)?,
            default_rating: parse_var("RATING_DEFAULT", DEFAULT_RATING)?,
        })
    }
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: DEFAULT_RATING_K_FACTOR,
            default_rating: DEFAULT_RATING,
        }
    }
}

impl WorkerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let concurrency = parse_var("WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY)?;
        if concurrency == 0 {
            return Err(ConfigError::InvalidValue("WORKER_CONCURRENCY".to_string()));
        }

        Ok(Self {
            concurrency,
            judge_queue: env::var("JUDGE_QUEUE").unwrap_or_else(|_| DEFAULT_JUDGE_QUEUE.to_string()),
            finalize_queue: env::var("FINALIZE_QUEUE")
                .unwrap_or_else(|_| DEFAULT_FINALIZE_QUEUE.to_string()),
        })
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}
