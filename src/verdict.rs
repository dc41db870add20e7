//! Verdict reduction
//!
//! Turns the per-run results reported by the judge into a single submission
//! verdict. Output is compared after trimming surrounding whitespace, and the
//! overall status is taken from the first failing case in input order.

use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    judge::{JudgeResult, JudgeStatus},
    models::SubmissionStatus,
};

/// Graded outcome of a single test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    /// 0-based position in the problem's test case order
    pub case_index: i32,
    pub passed: bool,
    pub status: SubmissionStatus,
    pub judge_status: JudgeStatus,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub time: Option<f64>,
    pub memory: Option<i64>,
}

/// Aggregated verdict for an entire submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: SubmissionStatus,
    pub passed_tests: i32,
    pub total_tests: i32,
    /// Mean time over all cases, absent times counted as zero
    pub avg_time: f64,
    /// Mean memory over all cases, absent values counted as zero
    pub avg_memory: f64,
    /// Index of the case that decided a failing verdict
    pub first_failure: Option<i32>,
    pub cases: Vec<CaseOutcome>,
}

/// Check a single run against its expected output
pub fn grade_case(case_index: i32, result: JudgeResult, expected_output: &str) -> CaseOutcome {
    let completed = result.status.is_normal_completion();
    let output_matches = result
        .stdout
        .as_deref()
        .unwrap_or_default()
        .trim()
        == expected_output.trim();

    let passed = completed && output_matches;
    let status = if passed {
        SubmissionStatus::Accepted
    } else if completed {
        SubmissionStatus::WrongAnswer
    } else {
        result.status.to_submission_status()
    };

    CaseOutcome {
        case_index,
        passed,
        status,
        judge_status: result.status,
        stdout: result.stdout,
        stderr: result.stderr,
        compile_output: result.compile_output,
        time: result.time,
        memory: result.memory,
    }
}

/// Reduce judge results to a submission verdict.
///
/// `results` and `expected_outputs` are matched by position and must have
/// the same, non-zero length.
pub fn reduce<S: AsRef<str>>(results: Vec<JudgeResult>, expected_outputs: &[S]) -> AppResult<Verdict> {
    if results.len() != expected_outputs.len() {
        return Err(AppError::Validation(format!(
            "judge returned {} results for {} test cases",
            results.len(),
            expected_outputs.len()
        )));
    }
    if results.is_empty() {
        return Err(AppError::Validation("cannot grade a submission without test cases".to_string()));
    }

    let cases: Vec<CaseOutcome> = results
        .into_iter()
        .zip(expected_outputs)
        .enumerate()
        .map(|(i, (result, expected))| grade_case(i as i32, result, expected.as_ref()))
        .collect();

    let total_tests = cases.len() as i32;
    let passed_tests = cases.iter().filter(|c| c.passed).count() as i32;

    let first_failure = cases.iter().find(|c| !c.passed);
    let status = match first_failure {
        None => SubmissionStatus::Accepted,
        Some(case) => case.status,
    };
    let first_failure = first_failure.map(|c| c.case_index);

    let n = total_tests as f64;
    let avg_time = cases.iter().map(|c| c.time.unwrap_or(0.0)).sum::<f64>() / n;
    let avg_memory = cases.iter().map(|c| c.memory.unwrap_or(0) as f64).sum::<f64>() / n;

    Ok(Verdict {
        status,
        passed_tests,
        total_tests,
        avg_time,
        avg_memory,
        first_failure,
        cases,
    })
}
