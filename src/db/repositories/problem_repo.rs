//! Problem repository

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Difficulty, Problem, TestCase},
};

/// Repository for problem database operations
pub struct ProblemRepository;

impl ProblemRepository {
    /// Create a new problem
    pub async fn create(conn: &mut PgConnection, title: &str, difficulty: Difficulty) -> AppResult<Problem> {
        let problem = sqlx::query_as::<_, Problem>(
            r#"
            INSERT INTO problems (title, difficulty)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(difficulty.as_str())
        .fetch_one(conn)
        .await?;

        Ok(problem)
    }

    /// Find problem by ID
    pub async fn find_by_id(conn: &mut PgConnection, id: &Uuid) -> AppResult<Option<Problem>> {
        let problem = sqlx::query_as::<_, Problem>(r#"SELECT * FROM problems WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(problem)
    }

    /// Count one terminal submission and recompute the acceptance rate from
    /// the updated counters
    pub async fn record_attempt(conn: &mut PgConnection, id: &Uuid, accepted: bool) -> AppResult<Problem> {
        let problem = sqlx::query_as::<_, Problem>(
            r#"
            UPDATE problems
            SET
                total_submissions = total_submissions + 1,
                total_accepted = total_accepted + CASE WHEN $2 THEN 1 ELSE 0 END,
                acceptance_rate = (total_accepted + CASE WHEN $2 THEN 1 ELSE 0 END)::DOUBLE PRECISION
                    / (total_submissions + 1)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(accepted)
        .fetch_one(conn)
        .await?;

        Ok(problem)
    }

    /// Add a test case
    pub async fn create_test_case(
        conn: &mut PgConnection,
        problem_id: &Uuid,
        input: &str,
        expected_output: &str,
        is_public: bool,
        weight: i32,
        position: i32,
    ) -> AppResult<TestCase> {
        let test_case = sqlx::query_as::<_, TestCase>(
            r#"
            INSERT INTO test_cases (problem_id, input, expected_output, is_public, weight, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(problem_id)
        .bind(input)
        .bind(expected_output)
        .bind(is_public)
        .bind(weight)
        .bind(position)
        .fetch_one(conn)
        .await?;

        Ok(test_case)
    }

    /// Get test cases for a problem in grading order
    pub async fn get_test_cases(conn: &mut PgConnection, problem_id: &Uuid) -> AppResult<Vec<TestCase>> {
        let test_cases = sqlx::query_as::<_, TestCase>(
            r#"SELECT * FROM test_cases WHERE problem_id = $1 ORDER BY position, id"#,
        )
        .bind(problem_id)
        .fetch_all(conn)
        .await?;

        Ok(test_cases)
    }

    /// Insert the solve marker and bump the difficulty counter.
    ///
    /// Must run inside a transaction; returns `false` if the marker existed.
    pub async fn mark_solved(
        conn: &mut PgConnection,
        user_id: &Uuid,
        problem_id: &Uuid,
        difficulty: Difficulty,
    ) -> AppResult<bool> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO solved_problems (user_id, problem_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, problem_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(problem_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Ok(false);
        }

        let (easy, medium, hard) = match difficulty {
            Difficulty::Easy => (1, 0, 0),
            Difficulty::Medium => (0, 1, 0),
            Difficulty::Hard => (0, 0, 1),
        };

        sqlx::query(
            r#"
            INSERT INTO user_stats (user_id, easy_solved, medium_solved, hard_solved, total_solved)
            VALUES ($1, $2, $3, $4, 1)
            ON CONFLICT (user_id) DO UPDATE SET
                easy_solved = user_stats.easy_solved + EXCLUDED.easy_solved,
                medium_solved = user_stats.medium_solved + EXCLUDED.medium_solved,
                hard_solved = user_stats.hard_solved + EXCLUDED.hard_solved,
                total_solved = user_stats.total_solved + 1
            "#,
        )
        .bind(user_id)
        .bind(easy)
        .bind(medium)
        .bind(hard)
        .execute(&mut *conn)
        .await?;

        Ok(true)
    }
}
