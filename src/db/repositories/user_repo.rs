//! User repository

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{User, UserStats},
};

/// Repository for user database operations
pub struct UserRepository;

impl UserRepository {
    /// Create a new, unrated user
    pub async fn create(conn: &mut PgConnection, username: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(username)
        .fetch_one(conn)
        .await?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(conn: &mut PgConnection, id: &Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(user)
    }

    /// Solve counters, all zero for users without a solve
    pub async fn get_stats(conn: &mut PgConnection, user_id: &Uuid) -> AppResult<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(r#"SELECT * FROM user_stats WHERE user_id = $1"#)
            .bind(user_id)
            .fetch_optional(conn)
            .await?;

        Ok(stats.unwrap_or(UserStats {
            user_id: *user_id,
            ..Default::default()
        }))
    }

    /// Apply a contest result to the user's rating fields. The peak covers
    /// both the rating entered with and the new one.
    pub async fn apply_rating(
        conn: &mut PgConnection,
        id: &Uuid,
        old_rating: i32,
        new_rating: i32,
    ) -> AppResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET
                rating = $3,
                max_rating = GREATEST(COALESCE(max_rating, $2), $2, $3),
                contests_participated = contests_participated + 1
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(old_rating)
        .bind(new_rating)
        .execute(conn)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(sqlx::Error::RowNotFound.into());
        }

        Ok(())
    }

    /// Undo one contest's rating update. `max_rating` is left untouched.
    pub async fn restore_rating(conn: &mut PgConnection, id: &Uuid, old_rating: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET
                rating = $2,
                contests_participated = GREATEST(contests_participated - 1, 0)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(old_rating)
        .execute(conn)
        .await?;

        Ok(())
    }
}
