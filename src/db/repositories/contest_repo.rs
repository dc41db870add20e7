//! Contest repository

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Contest, ContestParticipant, ContestProblem, ContestSubmission, LeaderboardEntry,
        NewContestSubmission, ParticipantScore,
    },
};

/// Repository for contest database operations
pub struct ContestRepository;

impl ContestRepository {
    /// Create a new contest
    pub async fn create(
        conn: &mut PgConnection,
        title: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> AppResult<Contest> {
        let contest = sqlx::query_as::<_, Contest>(
            r#"
            INSERT INTO contests (title, start_time, end_time)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(start_time)
        .bind(end_time)
        .fetch_one(conn)
        .await?;

        Ok(contest)
    }

    /// Find contest by ID
    pub async fn find_by_id(conn: &mut PgConnection, id: &Uuid) -> AppResult<Option<Contest>> {
        let contest = sqlx::query_as::<_, Contest>(r#"SELECT * FROM contests WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(contest)
    }

    /// Attach a problem to a contest
    pub async fn add_problem(
        conn: &mut PgConnection,
        contest_id: &Uuid,
        problem_id: &Uuid,
        position: i32,
        points: Option<i32>,
    ) -> AppResult<ContestProblem> {
        let problem = sqlx::query_as::<_, ContestProblem>(
            r#"
            INSERT INTO contest_problems (contest_id, problem_id, position, points)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(contest_id)
        .bind(problem_id)
        .bind(position)
        .bind(points)
        .fetch_one(conn)
        .await?;

        Ok(problem)
    }

    pub async fn find_problem(
        conn: &mut PgConnection,
        contest_id: &Uuid,
        problem_id: &Uuid,
    ) -> AppResult<Option<ContestProblem>> {
        let problem = sqlx::query_as::<_, ContestProblem>(
            r#"SELECT * FROM contest_problems WHERE contest_id = $1 AND problem_id = $2"#,
        )
        .bind(contest_id)
        .bind(problem_id)
        .fetch_optional(conn)
        .await?;

        Ok(problem)
    }

    /// Register a user for a contest
    pub async fn register_participant(
        conn: &mut PgConnection,
        contest_id: &Uuid,
        user_id: &Uuid,
    ) -> AppResult<ContestParticipant> {
        let participant = sqlx::query_as::<_, ContestParticipant>(
            r#"
            INSERT INTO contest_participants (contest_id, user_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(contest_id)
        .bind(user_id)
        .fetch_one(conn)
        .await?;

        Ok(participant)
    }

    pub async fn find_participant(
        conn: &mut PgConnection,
        contest_id: &Uuid,
        user_id: &Uuid,
    ) -> AppResult<Option<ContestParticipant>> {
        let participant = sqlx::query_as::<_, ContestParticipant>(
            r#"SELECT * FROM contest_participants WHERE contest_id = $1 AND user_id = $2"#,
        )
        .bind(contest_id)
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

        Ok(participant)
    }

    /// All participants in load order
    pub async fn list_participants(conn: &mut PgConnection, contest_id: &Uuid) -> AppResult<Vec<ContestParticipant>> {
        let participants = sqlx::query_as::<_, ContestParticipant>(
            r#"
            SELECT * FROM contest_participants
            WHERE contest_id = $1
            ORDER BY registered_at, id
            "#,
        )
        .bind(contest_id)
        .fetch_all(conn)
        .await?;

        Ok(participants)
    }

    /// Record one graded contest attempt
    pub async fn create_submission(
        conn: &mut PgConnection,
        new: &NewContestSubmission,
    ) -> AppResult<ContestSubmission> {
        let submission = sqlx::query_as::<_, ContestSubmission>(
            r#"
            INSERT INTO contest_submissions (
                contest_id, user_id, problem_id, submission_id,
                accepted, points, penalty, submitted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.contest_id)
        .bind(new.user_id)
        .bind(new.problem_id)
        .bind(new.submission_id)
        .bind(new.accepted)
        .bind(new.points)
        .bind(new.penalty)
        .bind(new.submitted_at)
        .fetch_one(conn)
        .await?;

        Ok(submission)
    }

    pub async fn list_submissions(
        conn: &mut PgConnection,
        contest_id: &Uuid,
        user_id: &Uuid,
    ) -> AppResult<Vec<ContestSubmission>> {
        let submissions = sqlx::query_as::<_, ContestSubmission>(
            r#"
            SELECT * FROM contest_submissions
            WHERE contest_id = $1 AND user_id = $2
            ORDER BY submitted_at, id
            "#,
        )
        .bind(contest_id)
        .bind(user_id)
        .fetch_all(conn)
        .await?;

        Ok(submissions)
    }

    pub async fn update_participant_score(
        conn: &mut PgConnection,
        contest_id: &Uuid,
        user_id: &Uuid,
        score: &ParticipantScore,
    ) -> AppResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE contest_participants
            SET score = $3, penalty = $4, finish_time = $5
            WHERE contest_id = $1 AND user_id = $2
            "#,
        )
        .bind(contest_id)
        .bind(user_id)
        .bind(score.score)
        .bind(score.penalty)
        .bind(score.finish_time)
        .execute(conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }

        Ok(())
    }

    /// Take the transaction-scoped lock that serializes rank refreshes of
    /// one contest across processes
    pub async fn lock_standings(conn: &mut PgConnection, contest_id: &Uuid) -> AppResult<()> {
        sqlx::query(r#"SELECT pg_advisory_xact_lock(hashtext($1::text))"#)
            .bind(contest_id)
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Persist computed ranks
    pub async fn save_ranks(
        conn: &mut PgConnection,
        contest_id: &Uuid,
        leaderboard: &[LeaderboardEntry],
    ) -> AppResult<()> {
        let user_ids: Vec<Uuid> = leaderboard.iter().map(|e| e.user_id).collect();
        let ranks: Vec<i32> = leaderboard.iter().map(|e| e.rank).collect();

        sqlx::query(
            r#"
            UPDATE contest_participants AS p
            SET rank = r.rank
            FROM UNNEST($2::uuid[], $3::int4[]) AS r(user_id, rank)
            WHERE p.contest_id = $1 AND p.user_id = r.user_id
            "#,
        )
        .bind(contest_id)
        .bind(&user_ids)
        .bind(&ranks)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Set the finalized flag. Returns `false` if it was already set.
    pub async fn mark_finalized(conn: &mut PgConnection, contest_id: &Uuid) -> AppResult<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE contests
            SET rating_finalized = TRUE, finalized_at = NOW()
            WHERE id = $1 AND NOT rating_finalized
            "#,
        )
        .bind(contest_id)
        .execute(conn)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    pub async fn unmark_finalized(conn: &mut PgConnection, contest_id: &Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE contests
            SET rating_finalized = FALSE, finalized_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(contest_id)
        .execute(conn)
        .await?;

        Ok(())
    }
}
