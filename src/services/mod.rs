//! Grading, scoring and rating services

pub mod contest_service;
pub mod rating_service;
pub mod submission_service;

pub use contest_service::ContestService;
pub use rating_service::{compute_rating_changes, RatingService};
pub use submission_service::{SubmissionService, SubmitRequest};
