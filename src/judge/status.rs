//! Judge status ids
//!
//! The numeric ids and descriptions are part of the judge's public contract
//! and are shown to users verbatim, so the table below must not be reordered
//! or renamed.

use serde::{Deserialize, Serialize};

use crate::models::SubmissionStatus;

/// Status reported by the judge for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JudgeStatus {
    InQueue,
    Processing,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeErrorSigsegv,
    RuntimeErrorSigxfsz,
    RuntimeErrorSigfpe,
    RuntimeErrorSigabrt,
    RuntimeErrorNzec,
    RuntimeErrorOther,
    InternalError,
    ExecFormatError,
}

impl JudgeStatus {
    /// Every known status, in id order
    pub const ALL: [JudgeStatus; 14] = [
        Self::InQueue,
        Self::Processing,
        Self::Accepted,
        Self::WrongAnswer,
        Self::TimeLimitExceeded,
        Self::CompilationError,
        Self::RuntimeErrorSigsegv,
        Self::RuntimeErrorSigxfsz,
        Self::RuntimeErrorSigfpe,
        Self::RuntimeErrorSigabrt,
        Self::RuntimeErrorNzec,
        Self::RuntimeErrorOther,
        Self::InternalError,
        Self::ExecFormatError,
    ];

    /// Map a wire status id
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Self::InQueue),
            2 => Some(Self::Processing),
            3 => Some(Self::Accepted),
            4 => Some(Self::WrongAnswer),
            5 => Some(Self::TimeLimitExceeded),
            6 => Some(Self::CompilationError),
            7 => Some(Self::RuntimeErrorSigsegv),
            8 => Some(Self::RuntimeErrorSigxfsz),
            9 => Some(Self::RuntimeErrorSigfpe),
            10 => Some(Self::RuntimeErrorSigabrt),
            11 => Some(Self::RuntimeErrorNzec),
            12 => Some(Self::RuntimeErrorOther),
            13 => Some(Self::InternalError),
            14 => Some(Self::ExecFormatError),
            _ => None,
        }
    }

    pub fn id(&self) -> i32 {
        match self {
            Self::InQueue => 1,
            Self::Processing => 2,
            Self::Accepted => 3,
            Self::WrongAnswer => 4,
            Self::TimeLimitExceeded => 5,
            Self::CompilationError => 6,
            Self::RuntimeErrorSigsegv => 7,
            Self::RuntimeErrorSigxfsz => 8,
            Self::RuntimeErrorSigfpe => 9,
            Self::RuntimeErrorSigabrt => 10,
            Self::RuntimeErrorNzec => 11,
            Self::RuntimeErrorOther => 12,
            Self::InternalError => 13,
            Self::ExecFormatError => 14,
        }
    }

    /// Human readable description, identical to the judge's own
    pub fn description(&self) -> &'static str {
        match self {
            Self::InQueue => "In Queue",
            Self::Processing => "Processing",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::TimeLimitExceeded => "Time Limit Exceeded",
            Self::CompilationError => "Compilation Error",
            Self::RuntimeErrorSigsegv => "Runtime Error (SIGSEGV)",
            Self::RuntimeErrorSigxfsz => "Runtime Error (SIGXFSZ)",
            Self::RuntimeErrorSigfpe => "Runtime Error (SIGFPE)",
            Self::RuntimeErrorSigabrt => "Runtime Error (SIGABRT)",
            Self::RuntimeErrorNzec => "Runtime Error (NZEC)",
            Self::RuntimeErrorOther => "Runtime Error (Other)",
            Self::InternalError => "Internal Error",
            Self::ExecFormatError => "Exec Format Error",
        }
    }

    /// Check if the run is finished (not queued or processing)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InQueue | Self::Processing)
    }

    /// The program ran to completion and produced output that can be compared.
    ///
    /// The judge's own answer check is exact, so both Accepted and Wrong Answer
    /// count; the grader re-compares trimmed output itself.
    pub fn is_normal_completion(&self) -> bool {
        matches!(self, Self::Accepted | Self::WrongAnswer)
    }

    /// Submission status this run maps to when it fails
    pub fn to_submission_status(&self) -> SubmissionStatus {
        match self {
            Self::InQueue | Self::Processing => SubmissionStatus::Pending,
            Self::Accepted => SubmissionStatus::Accepted,
            Self::WrongAnswer => SubmissionStatus::WrongAnswer,
            Self::TimeLimitExceeded => SubmissionStatus::TimeLimitExceeded,
            Self::CompilationError => SubmissionStatus::CompileError,
            Self::RuntimeErrorSigsegv
            | Self::RuntimeErrorSigxfsz
            | Self::RuntimeErrorSigfpe
            | Self::RuntimeErrorSigabrt
            | Self::RuntimeErrorNzec
            | Self::RuntimeErrorOther => SubmissionStatus::RuntimeError,
            Self::InternalError | Self::ExecFormatError => SubmissionStatus::InternalError,
        }
    }
}

impl std::fmt::Display for JudgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_table_is_stable() {
        for (i, status) in JudgeStatus::ALL.iter().enumerate() {
            assert_eq!(status.id(), i as i32 + 1);
            assert_eq!(JudgeStatus::from_id(status.id()), Some(*status));
        }
        assert_eq!(JudgeStatus::from_id(0), None);
        assert_eq!(JudgeStatus::from_id(15), None);
    }

    #[test]
    fn test_terminal_and_normal_completion() {
        assert!(!JudgeStatus::InQueue.is_terminal());
        assert!(!JudgeStatus::Processing.is_terminal());
        assert!(JudgeStatus::CompilationError.is_terminal());

        assert!(JudgeStatus::Accepted.is_normal_completion());
        assert!(JudgeStatus::WrongAnswer.is_normal_completion());
        assert!(!JudgeStatus::TimeLimitExceeded.is_normal_completion());
        assert!(!JudgeStatus::RuntimeErrorNzec.is_normal_completion());
    }

    #[test]
    fn test_submission_status_mapping() {
        assert_eq!(
            JudgeStatus::CompilationError.to_submission_status(),
            SubmissionStatus::CompileError
        );
        assert_eq!(
            JudgeStatus::RuntimeErrorSigfpe.to_submission_status(),
            SubmissionStatus::RuntimeError
        );
        assert_eq!(
            JudgeStatus::ExecFormatError.to_submission_status(),
            SubmissionStatus::InternalError
        );
        assert_eq!(JudgeStatus::RuntimeErrorSigsegv.description(), "Runtime Error (SIGSEGV)");
    }
}
