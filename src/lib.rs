//! Contest Grader - submission grading and contest ranking pipeline
//!
//! Takes submitted source code through an external judge, reduces the
//! per-test-case results to a verdict, keeps contest standings ranked and
//! applies Elo-style rating changes once a contest ends.
//!
//! # Architecture
//!
//! - **Judge**: HTTP client for the external judge (batch submit, bounded polling)
//! - **Verdict**: per-case grading and verdict reduction
//! - **Services**: submission pipeline, contest scoring, rating engine
//! - **Store**: transactional persistence (PostgreSQL or in-memory)
//! - **Events**: fire-and-forget notifications
//! - **Worker**: Redis queue consumer driving the services

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod events;
pub mod judge;
pub mod models;
pub mod scoring;
pub mod services;
pub mod state;
pub mod utils;
pub mod verdict;
pub mod worker;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
