//! Test case model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Test case database model
///
/// Test cases are never edited in place once a submission has been graded
/// against them; changes are made by adding new rows.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub input: String,
    pub expected_output: String,
    pub is_public: bool,
    pub weight: i32,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}
