//! Problem model

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Problem database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub title: String,
    pub difficulty: String,
    pub total_submissions: i64,
    pub total_accepted: i64,
    /// `total_accepted / total_submissions`, 0 while nothing was submitted
    pub acceptance_rate: f64,
    pub created_at: DateTime<Utc>,
}

impl Problem {
    /// Parsed difficulty, falling back to medium for unknown values
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty.parse().unwrap_or(Difficulty::Medium)
    }
}

/// Compute the acceptance rate for the given counters
pub fn acceptance_rate(total_accepted: i64, total_submissions: i64) -> f64 {
    if total_submissions <= 0 {
        0.0
    } else {
        total_accepted as f64 / total_submissions as f64
    }
}

/// Problem difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EASY" => Ok(Self::Easy),
            "MEDIUM" => Ok(Self::Medium),
            "HARD" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty: {}", other)),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
