//! User model
//!
//! Only the rating-related slice of the user record lives here; profile and
//! credentials are owned elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// `None` until the first finalized contest
    pub rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub contests_participated: i32,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Current rating, or `default` for users that were never rated
    pub fn rating_or(&self, default: i32) -> i32 {
        self.rating.unwrap_or(default)
    }
}

/// Difficulty-bucketed solve counters
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub easy_solved: i32,
    pub medium_solved: i32,
    pub hard_solved: i32,
    pub total_solved: i32,
}
