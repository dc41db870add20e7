//! Rating history model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ledger entry written once per (contest, user) at finalization
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RatingHistory {
    pub id: Uuid,
    pub contest_id: Uuid,
    pub user_id: Uuid,
    pub old_rating: i32,
    pub new_rating: i32,
    pub delta: i32,
    pub rank: i32,
    pub created_at: DateTime<Utc>,
}

/// Input row for the rating engine: final rank plus pre-contest rating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingParticipant {
    pub user_id: Uuid,
    pub rank: i32,
    pub rating: i32,
}

/// Computed rating change for one participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    pub user_id: Uuid,
    pub old_rating: i32,
    pub new_rating: i32,
    pub delta: i32,
    pub rank: i32,
}
