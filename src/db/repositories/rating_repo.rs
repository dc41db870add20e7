//! Rating history repository

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{RatingChange, RatingHistory, RatingParticipant},
};

/// Repository for rating ledger operations
pub struct RatingRepository;

impl RatingRepository {
    /// Ranked participants joined with their current rating
    pub async fn list_inputs(
        conn: &mut PgConnection,
        contest_id: &Uuid,
        default_rating: i32,
    ) -> AppResult<Vec<RatingParticipant>> {
        let rows = sqlx::query_as::<_, (Uuid, i32, i32)>(
            r#"
            SELECT p.user_id, p.rank, COALESCE(u.rating, $2)
            FROM contest_participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.contest_id = $1 AND p.rank IS NOT NULL
            ORDER BY p.rank, p.registered_at, p.id
            "#,
        )
        .bind(contest_id)
        .bind(default_rating)
        .fetch_all(conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, rank, rating)| RatingParticipant { user_id, rank, rating })
            .collect())
    }

    pub async fn insert(conn: &mut PgConnection, contest_id: &Uuid, change: &RatingChange) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rating_history (contest_id, user_id, old_rating, new_rating, delta, rank)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(contest_id)
        .bind(change.user_id)
        .bind(change.old_rating)
        .bind(change.new_rating)
        .bind(change.delta)
        .bind(change.rank)
        .execute(conn)
        .await?;

        Ok(())
    }

    pub async fn list_for_contest(conn: &mut PgConnection, contest_id: &Uuid) -> AppResult<Vec<RatingHistory>> {
        let history = sqlx::query_as::<_, RatingHistory>(
            r#"SELECT * FROM rating_history WHERE contest_id = $1 ORDER BY rank, user_id"#,
        )
        .bind(contest_id)
        .fetch_all(conn)
        .await?;

        Ok(history)
    }

    /// Delete a contest's ledger, returning the removed rows
    pub async fn delete_for_contest(conn: &mut PgConnection, contest_id: &Uuid) -> AppResult<Vec<RatingHistory>> {
        let history = sqlx::query_as::<_, RatingHistory>(
            r#"DELETE FROM rating_history WHERE contest_id = $1 RETURNING *"#,
        )
        .bind(contest_id)
        .fetch_all(conn)
        .await?;

        Ok(history)
    }
}
