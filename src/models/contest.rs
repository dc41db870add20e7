//! Contest model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Contest database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Contest {
    pub id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub rating_finalized: bool,
    pub finalized_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Contest {
    /// Get current status of the contest
    pub fn status(&self) -> ContestStatus {
        self.status_at(Utc::now())
    }

    /// Status of the contest at the given instant
    pub fn status_at(&self, now: DateTime<Utc>) -> ContestStatus {
        if now < self.start_time {
            ContestStatus::Upcoming
        } else if now < self.end_time {
            ContestStatus::Ongoing
        } else {
            ContestStatus::Ended
        }
    }

    /// Whole minutes elapsed between contest start and `at`, never negative
    pub fn minutes_since_start(&self, at: DateTime<Utc>) -> i64 {
        (at - self.start_time).num_minutes().max(0)
    }
}

/// Contest status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    Upcoming,
    Ongoing,
    Ended,
}

impl std::fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upcoming => write!(f, "upcoming"),
            Self::Ongoing => write!(f, "ongoing"),
            Self::Ended => write!(f, "ended"),
        }
    }
}

/// Contest problem association
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContestProblem {
    pub id: Uuid,
    pub contest_id: Uuid,
    pub problem_id: Uuid,
    pub position: i32,
    pub points: Option<i32>,
}

/// Contest participant model
///
/// The only aggregate mutated while a contest is live.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContestParticipant {
    pub id: Uuid,
    pub contest_id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
    pub penalty: i64,
    pub finish_time: Option<DateTime<Utc>>,
    pub rank: Option<i32>,
    pub registered_at: DateTime<Utc>,
}

/// One graded attempt inside a contest
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContestSubmission {
    pub id: Uuid,
    pub contest_id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub submission_id: Uuid,
    pub accepted: bool,
    pub points: i32,
    pub penalty: i64,
    pub submitted_at: DateTime<Utc>,
}

/// Fields needed to record a contest attempt
#[derive(Debug, Clone)]
pub struct NewContestSubmission {
    pub contest_id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub submission_id: Uuid,
    pub accepted: bool,
    pub points: i32,
    pub penalty: i64,
    pub submitted_at: DateTime<Utc>,
}

/// Recomputed standing of a single participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantScore {
    pub score: i32,
    pub penalty: i64,
    pub finish_time: Option<DateTime<Utc>>,
}

/// Leaderboard row as broadcast to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: Uuid,
    pub rank: i32,
    pub score: i32,
    pub penalty: i64,
    pub finish_time: Option<DateTime<Utc>>,
}
