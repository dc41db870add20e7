//! Submission repository

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    constants::statuses,
    error::{AppError, AppResult},
    models::{NewSubmission, Submission, TestcaseResult},
    verdict::{CaseOutcome, Verdict},
};

/// Repository for submission database operations
pub struct SubmissionRepository;

impl SubmissionRepository {
    /// Create a new pending submission
    pub async fn create(conn: &mut PgConnection, new: &NewSubmission) -> AppResult<Submission> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (
                user_id, problem_id, contest_id, language, language_id,
                source_code, status, total_tests
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.problem_id)
        .bind(new.contest_id)
        .bind(&new.language)
        .bind(new.language_id)
        .bind(&new.source_code)
        .bind(statuses::PENDING)
        .bind(new.total_tests)
        .fetch_one(conn)
        .await?;

        Ok(submission)
    }

    /// Find submission by ID
    pub async fn find_by_id(conn: &mut PgConnection, id: &Uuid) -> AppResult<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>(r#"SELECT * FROM submissions WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(submission)
    }

    /// Mark a pending submission as failed by the pipeline
    pub async fn fail(conn: &mut PgConnection, id: &Uuid, message: &str) -> AppResult<Submission> {
        sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET status = $2, stderr = $3, judged_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(statuses::INTERNAL_ERROR)
        .bind(message)
        .bind(statuses::PENDING)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| not_pending(id))
    }

    /// Write the final verdict of a pending submission
    pub async fn complete(conn: &mut PgConnection, id: &Uuid, verdict: &Verdict) -> AppResult<Submission> {
        sqlx::query_as::<_, Submission>(
            r#"
            UPDATE submissions
            SET
                status = $2,
                passed_tests = $3,
                total_tests = $4,
                avg_time = $5,
                avg_memory = $6,
                judged_at = NOW()
            WHERE id = $1 AND status = $7
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(verdict.status.as_str())
        .bind(verdict.passed_tests)
        .bind(verdict.total_tests)
        .bind(verdict.avg_time)
        .bind(verdict.avg_memory)
        .bind(statuses::PENDING)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| not_pending(id))
    }

    /// Save one graded test case
    pub async fn save_testcase_result(
        conn: &mut PgConnection,
        submission_id: &Uuid,
        case: &CaseOutcome,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO testcase_results (
                submission_id, case_index, passed, status,
                stdout, stderr, compile_output, time, memory
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(submission_id)
        .bind(case.case_index)
        .bind(case.passed)
        .bind(case.status.as_str())
        .bind(&case.stdout)
        .bind(&case.stderr)
        .bind(&case.compile_output)
        .bind(case.time)
        .bind(case.memory)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Get per-case results in case order
    pub async fn list_testcase_results(
        conn: &mut PgConnection,
        submission_id: &Uuid,
    ) -> AppResult<Vec<TestcaseResult>> {
        let results = sqlx::query_as::<_, TestcaseResult>(
            r#"SELECT * FROM testcase_results WHERE submission_id = $1 ORDER BY case_index"#,
        )
        .bind(submission_id)
        .fetch_all(conn)
        .await?;

        Ok(results)
    }
}

fn not_pending(id: &Uuid) -> AppError {
    AppError::Conflict(format!("Submission {} is not pending", id))
}
