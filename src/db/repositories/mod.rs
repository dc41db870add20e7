//! Database repositories
//!
//! Repositories handle all direct database interactions. They take a bare
//! connection so the same query can run on a pooled connection or inside a
//! transaction.

pub mod contest_repo;
pub mod problem_repo;
pub mod rating_repo;
pub mod submission_repo;
pub mod user_repo;

pub use contest_repo::ContestRepository;
pub use problem_repo::ProblemRepository;
pub use rating_repo::RatingRepository;
pub use submission_repo::SubmissionRepository;
pub use user_repo::UserRepository;
