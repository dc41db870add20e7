//! Submission model

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::constants::statuses;

/// Submission database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub contest_id: Option<Uuid>,
    pub language: String,
    pub language_id: i32,
    #[serde(skip_serializing)]
    pub source_code: String,
    pub status: String,
    pub passed_tests: i32,
    pub total_tests: i32,
    /// Mean wall time per test case, in seconds
    pub avg_time: Option<f64>,
    /// Mean peak memory per test case, in KB
    pub avg_memory: Option<f64>,
    /// Pipeline error message when the judge could not be used
    pub stderr: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub judged_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// Parsed lifecycle status
    pub fn status(&self) -> SubmissionStatus {
        self.status.parse().unwrap_or(SubmissionStatus::InternalError)
    }
}

/// Submission lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    RuntimeError,
    CompileError,
    InternalError,
}

impl SubmissionStatus {
    /// Get status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => statuses::PENDING,
            Self::Accepted => statuses::ACCEPTED,
            Self::WrongAnswer => statuses::WRONG_ANSWER,
            Self::TimeLimitExceeded => statuses::TIME_LIMIT_EXCEEDED,
            Self::RuntimeError => statuses::RUNTIME_ERROR,
            Self::CompileError => statuses::COMPILE_ERROR,
            Self::InternalError => statuses::INTERNAL_ERROR,
        }
    }

    /// Check if this is a terminal status (judging complete)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Check if this status means the solution was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            statuses::PENDING => Ok(Self::Pending),
            statuses::ACCEPTED => Ok(Self::Accepted),
            statuses::WRONG_ANSWER => Ok(Self::WrongAnswer),
            statuses::TIME_LIMIT_EXCEEDED => Ok(Self::TimeLimitExceeded),
            statuses::RUNTIME_ERROR => Ok(Self::RuntimeError),
            statuses::COMPILE_ERROR => Ok(Self::CompileError),
            statuses::INTERNAL_ERROR => Ok(Self::InternalError),
            other => Err(format!("unknown submission status: {}", other)),
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields needed to insert a pending submission
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub contest_id: Option<Uuid>,
    pub language: String,
    pub language_id: i32,
    pub source_code: String,
    pub total_tests: i32,
}

/// Per test case result for a submission
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestcaseResult {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub case_index: i32,
    pub passed: bool,
    pub status: String,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub time: Option<f64>,
    pub memory: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::Accepted,
            SubmissionStatus::CompileError,
            SubmissionStatus::InternalError,
        ] {
            assert_eq!(status.as_str().parse::<SubmissionStatus>().unwrap(), status);
        }
        assert!("accepted".parse::<SubmissionStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SubmissionStatus::Pending.is_terminal());
        assert!(SubmissionStatus::WrongAnswer.is_terminal());
        assert!(SubmissionStatus::Accepted.is_accepted());
    }
}
