//! Domain models
//!
//! This module contains all domain models used by the grading pipeline.

pub mod contest;
pub mod problem;
pub mod rating;
pub mod submission;
pub mod test_case;
pub mod user;

pub use contest::*;
pub use problem::*;
pub use rating::*;
pub use submission::*;
pub use test_case::*;
pub use user::*;
