//! Persistence seam for the grading pipeline
//!
//! Every method that changes more than one row is atomic: either all of its
//! writes become visible or none do.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Contest, ContestParticipant, ContestProblem, ContestSubmission, Difficulty,
        LeaderboardEntry, NewContestSubmission, NewSubmission, ParticipantScore, Problem,
        RatingChange, RatingHistory, RatingParticipant, Submission, TestCase, TestcaseResult, User,
        UserStats,
    },
    verdict::{CaseOutcome, Verdict},
};

/// Transactional store used by the pipeline, scoring and rating engines
#[async_trait]
pub trait Store: Send + Sync {
    // Problems

    async fn find_problem(&self, id: Uuid) -> AppResult<Option<Problem>>;

    /// Test cases of a problem in grading order
    async fn get_test_cases(&self, problem_id: Uuid) -> AppResult<Vec<TestCase>>;

    /// Count a terminal submission and recompute the acceptance rate
    async fn record_problem_attempt(&self, problem_id: Uuid, accepted: bool) -> AppResult<Problem>;

    /// Record a solve and bump the user's difficulty counter.
    ///
    /// Returns `false` without changing anything if the user had already
    /// solved the problem.
    async fn mark_solved(&self, user_id: Uuid, problem_id: Uuid, difficulty: Difficulty) -> AppResult<bool>;

    // Submissions

    async fn create_submission(&self, submission: NewSubmission) -> AppResult<Submission>;

    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>>;

    /// Move a pending submission to INTERNAL_ERROR with an error message
    async fn fail_submission(&self, id: Uuid, message: &str) -> AppResult<Submission>;

    async fn save_testcase_results(&self, submission_id: Uuid, cases: &[CaseOutcome]) -> AppResult<()>;

    async fn list_testcase_results(&self, submission_id: Uuid) -> AppResult<Vec<TestcaseResult>>;

    /// Write the verdict of a pending submission in one statement
    async fn complete_submission(&self, id: Uuid, verdict: &Verdict) -> AppResult<Submission>;

    // Contests

    async fn find_contest(&self, id: Uuid) -> AppResult<Option<Contest>>;

    async fn find_contest_problem(&self, contest_id: Uuid, problem_id: Uuid) -> AppResult<Option<ContestProblem>>;

    async fn register_participant(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<ContestParticipant>;

    async fn find_participant(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Option<ContestParticipant>>;

    /// Participants in load order: registration time, then id
    async fn list_participants(&self, contest_id: Uuid) -> AppResult<Vec<ContestParticipant>>;

    async fn create_contest_submission(&self, submission: NewContestSubmission) -> AppResult<ContestSubmission>;

    async fn list_contest_submissions(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Vec<ContestSubmission>>;

    async fn update_participant_score(
        &self,
        contest_id: Uuid,
        user_id: Uuid,
        score: ParticipantScore,
    ) -> AppResult<()>;

    /// Re-sort every participant and persist all ranks in one transaction
    async fn refresh_ranks(&self, contest_id: Uuid) -> AppResult<Vec<LeaderboardEntry>>;

    // Users and ratings

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn get_user_stats(&self, user_id: Uuid) -> AppResult<UserStats>;

    /// Ranked participants with their current rating, best rank first
    async fn list_rating_inputs(&self, contest_id: Uuid, default_rating: i32) -> AppResult<Vec<RatingParticipant>>;

    /// Apply all rating changes and mark the contest finalized.
    ///
    /// Fails with `AlreadyFinalized` if the contest is already marked.
    async fn commit_finalization(&self, contest_id: Uuid, changes: &[RatingChange]) -> AppResult<()>;

    /// Undo a finalization from its history rows. Returns the number of
    /// participants restored.
    async fn revert_finalization(&self, contest_id: Uuid) -> AppResult<usize>;

    async fn list_rating_history(&self, contest_id: Uuid) -> AppResult<Vec<RatingHistory>>;
}
