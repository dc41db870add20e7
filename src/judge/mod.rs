//! External judge integration
//!
//! The judge is a black-box service that accepts source code plus stdin and
//! eventually reports a status, output, timing and memory usage per run.
//! [`JudgeClient`] is the seam the pipeline talks to; [`Judge0Client`] is the
//! HTTP implementation.

pub mod client;
pub mod codec;
pub mod status;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::Judge0Client;
pub use status::JudgeStatus;

/// One run to submit: stdin plus the output it is expected to produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeTestCase {
    pub stdin: String,
    pub expected_output: String,
}

/// Decoded result of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeResult {
    pub token: String,
    pub status: JudgeStatus,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    /// Wall time in seconds
    pub time: Option<f64>,
    /// Peak memory in KB
    pub memory: Option<i64>,
}

/// Judge failure taxonomy.
///
/// A run that crashes, times out or fails to compile is not an error here;
/// it is reported through that run's [`JudgeStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JudgeError {
    #[error("judge service unavailable: {0}")]
    Unavailable(String),

    #[error("judge did not finish the batch after {polls} polls")]
    Timeout { polls: u32 },

    #[error("judge protocol error: {0}")]
    Protocol(String),
}

impl JudgeError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "JUDGE_UNAVAILABLE",
            Self::Timeout { .. } => "JUDGE_TIMEOUT",
            Self::Protocol(_) => "JUDGE_PROTOCOL_ERROR",
        }
    }

    /// Transient failures may be retried by the caller; protocol errors point
    /// at an integration break and will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Protocol(_))
    }
}

/// Executes source code against a batch of test cases
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JudgeClient: Send + Sync {
    /// Run `source_code` once per test case.
    ///
    /// Returns exactly one result per input case, in input order, once every
    /// run has reached a terminal status.
    async fn execute(
        &self,
        source_code: &str,
        language_id: i32,
        test_cases: &[JudgeTestCase],
    ) -> Result<Vec<JudgeResult>, JudgeError>;
}
