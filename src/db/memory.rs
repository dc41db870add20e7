//! In-process store
//!
//! Keeps every table in memory behind one mutex, so each operation is atomic
//! by construction. Foreign keys and unique constraints of the relational
//! schema are checked before anything is written. Used for embedding the
//! pipeline and for tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::store::Store;
use crate::{
    constants::statuses,
    error::{AppError, AppResult},
    models::{
        acceptance_rate, Contest, ContestParticipant, ContestProblem, ContestSubmission,
        Difficulty, LeaderboardEntry, NewContestSubmission, NewSubmission, ParticipantScore,
        Problem, RatingChange, RatingHistory, RatingParticipant, Submission, SubmissionStatus,
        TestCase, TestcaseResult, User, UserStats,
    },
    scoring,
    verdict::{CaseOutcome, Verdict},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    user_stats: HashMap<Uuid, UserStats>,
    problems: HashMap<Uuid, Problem>,
    test_cases: Vec<TestCase>,
    submissions: HashMap<Uuid, Submission>,
    testcase_results: Vec<TestcaseResult>,
    solved: HashSet<(Uuid, Uuid)>,
    contests: HashMap<Uuid, Contest>,
    contest_problems: Vec<ContestProblem>,
    participants: Vec<ContestParticipant>,
    contest_submissions: Vec<ContestSubmission>,
    rating_history: Vec<RatingHistory>,
}

impl Tables {
    fn require_user(&self, id: &Uuid) -> AppResult<()> {
        if self.users.contains_key(id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("User {} not found", id)))
        }
    }

    fn require_problem(&self, id: &Uuid) -> AppResult<()> {
        if self.problems.contains_key(id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Problem {} not found", id)))
        }
    }

    fn require_contest(&self, id: &Uuid) -> AppResult<()> {
        if self.contests.contains_key(id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Contest {} not found", id)))
        }
    }

    fn pending_submission(&mut self, id: &Uuid) -> AppResult<&mut Submission> {
        let submission = self
            .submissions
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;

        if submission.status != statuses::PENDING {
            return Err(AppError::Conflict(format!("Submission {} is not pending", id)));
        }
        Ok(submission)
    }

    /// Participants of a contest in load order
    fn participants_of(&self, contest_id: &Uuid) -> Vec<ContestParticipant> {
        let mut participants: Vec<ContestParticipant> = self
            .participants
            .iter()
            .filter(|p| p.contest_id == *contest_id)
            .cloned()
            .collect();
        participants.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then(a.id.cmp(&b.id)));
        participants
    }
}

/// [`Store`] kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }

    /// Add a user
    pub fn insert_user(&self, username: &str, rating: Option<i32>) -> AppResult<User> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.username == username) {
            return Err(AppError::AlreadyExists(format!("User {} already exists", username)));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            rating,
            max_rating: rating,
            contests_participated: 0,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Add a problem with zeroed counters
    pub fn insert_problem(&self, title: &str, difficulty: Difficulty) -> AppResult<Problem> {
        let problem = Problem {
            id: Uuid::new_v4(),
            title: title.to_string(),
            difficulty: difficulty.as_str().to_string(),
            total_submissions: 0,
            total_accepted: 0,
            acceptance_rate: 0.0,
            created_at: Utc::now(),
        };
        self.tables()?.problems.insert(problem.id, problem.clone());
        Ok(problem)
    }

    /// Append a test case after the problem's existing ones
    pub fn insert_test_case(&self, problem_id: Uuid, input: &str, expected_output: &str) -> AppResult<TestCase> {
        let mut tables = self.tables()?;
        tables.require_problem(&problem_id)?;

        let position = tables.test_cases.iter().filter(|t| t.problem_id == problem_id).count() as i32;
        let test_case = TestCase {
            id: Uuid::new_v4(),
            problem_id,
            input: input.to_string(),
            expected_output: expected_output.to_string(),
            is_public: position == 0,
            weight: 1,
            position,
            created_at: Utc::now(),
        };
        tables.test_cases.push(test_case.clone());
        Ok(test_case)
    }

    /// Add a contest
    pub fn insert_contest(&self, title: &str, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> AppResult<Contest> {
        if end_time <= start_time {
            return Err(AppError::Validation("Contest must end after it starts".to_string()));
        }

        let contest = Contest {
            id: Uuid::new_v4(),
            title: title.to_string(),
            start_time,
            end_time,
            rating_finalized: false,
            finalized_at: None,
            created_at: Utc::now(),
        };
        self.tables()?.contests.insert(contest.id, contest.clone());
        Ok(contest)
    }

    /// Attach a problem to a contest
    pub fn add_contest_problem(&self, contest_id: Uuid, problem_id: Uuid, points: Option<i32>) -> AppResult<ContestProblem> {
        let mut tables = self.tables()?;
        tables.require_contest(&contest_id)?;
        tables.require_problem(&problem_id)?;
        if tables
            .contest_problems
            .iter()
            .any(|cp| cp.contest_id == contest_id && cp.problem_id == problem_id)
        {
            return Err(AppError::AlreadyExists("Problem already in contest".to_string()));
        }

        let position = tables.contest_problems.iter().filter(|cp| cp.contest_id == contest_id).count() as i32;
        let contest_problem = ContestProblem {
            id: Uuid::new_v4(),
            contest_id,
            problem_id,
            position,
            points,
        };
        tables.contest_problems.push(contest_problem.clone());
        Ok(contest_problem)
    }

    /// Reschedule a contest
    pub fn set_contest_times(&self, contest_id: Uuid, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables()?;
        let contest = tables
            .contests
            .get_mut(&contest_id)
            .ok_or_else(|| AppError::NotFound(format!("Contest {} not found", contest_id)))?;
        contest.start_time = start_time;
        contest.end_time = end_time;
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_problem(&self, id: Uuid) -> AppResult<Option<Problem>> {
        Ok(self.tables()?.problems.get(&id).cloned())
    }

    async fn get_test_cases(&self, problem_id: Uuid) -> AppResult<Vec<TestCase>> {
        let tables = self.tables()?;
        let mut cases: Vec<TestCase> = tables
            .test_cases
            .iter()
            .filter(|t| t.problem_id == problem_id)
            .cloned()
            .collect();
        cases.sort_by(|a, b| a.position.cmp(&b.position).then(a.id.cmp(&b.id)));
        Ok(cases)
    }

    async fn record_problem_attempt(&self, problem_id: Uuid, accepted: bool) -> AppResult<Problem> {
        let mut tables = self.tables()?;
        let problem = tables
            .problems
            .get_mut(&problem_id)
            .ok_or_else(|| AppError::NotFound(format!("Problem {} not found", problem_id)))?;

        problem.total_submissions += 1;
        if accepted {
            problem.total_accepted += 1;
        }
        problem.acceptance_rate = acceptance_rate(problem.total_accepted, problem.total_submissions);
        Ok(problem.clone())
    }

    async fn mark_solved(&self, user_id: Uuid, problem_id: Uuid, difficulty: Difficulty) -> AppResult<bool> {
        let mut tables = self.tables()?;
        tables.require_user(&user_id)?;
        tables.require_problem(&problem_id)?;

        if !tables.solved.insert((user_id, problem_id)) {
            return Ok(false);
        }

        let stats = tables.user_stats.entry(user_id).or_insert_with(|| UserStats {
            user_id,
            ..Default::default()
        });
        match difficulty {
            Difficulty::Easy => stats.easy_solved += 1,
            Difficulty::Medium => stats.medium_solved += 1,
            Difficulty::Hard => stats.hard_solved += 1,
        }
        stats.total_solved += 1;
        Ok(true)
    }

    async fn create_submission(&self, new: NewSubmission) -> AppResult<Submission> {
        let mut tables = self.tables()?;
        tables.require_user(&new.user_id)?;
        tables.require_problem(&new.problem_id)?;
        if let Some(contest_id) = &new.contest_id {
            tables.require_contest(contest_id)?;
        }

        let submission = Submission {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            problem_id: new.problem_id,
            contest_id: new.contest_id,
            language: new.language,
            language_id: new.language_id,
            source_code: new.source_code,
            status: SubmissionStatus::Pending.as_str().to_string(),
            passed_tests: 0,
            total_tests: new.total_tests,
            avg_time: None,
            avg_memory: None,
            stderr: None,
            submitted_at: Utc::now(),
            judged_at: None,
        };
        tables.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>> {
        Ok(self.tables()?.submissions.get(&id).cloned())
    }

    async fn fail_submission(&self, id: Uuid, message: &str) -> AppResult<Submission> {
        let mut tables = self.tables()?;
        let submission = tables.pending_submission(&id)?;

        submission.status = SubmissionStatus::InternalError.as_str().to_string();
        submission.stderr = Some(message.to_string());
        submission.judged_at = Some(Utc::now());
        Ok(submission.clone())
    }

    async fn save_testcase_results(&self, submission_id: Uuid, cases: &[CaseOutcome]) -> AppResult<()> {
        let mut tables = self.tables()?;
        if !tables.submissions.contains_key(&submission_id) {
            return Err(AppError::NotFound(format!("Submission {} not found", submission_id)));
        }

        let mut seen: HashSet<i32> = tables
            .testcase_results
            .iter()
            .filter(|r| r.submission_id == submission_id)
            .map(|r| r.case_index)
            .collect();
        if !cases.iter().all(|c| seen.insert(c.case_index)) {
            return Err(AppError::AlreadyExists("Test case result already recorded".to_string()));
        }

        let now = Utc::now();
        tables.testcase_results.extend(cases.iter().map(|case| TestcaseResult {
            id: Uuid::new_v4(),
            submission_id,
            case_index: case.case_index,
            passed: case.passed,
            status: case.status.as_str().to_string(),
            stdout: case.stdout.clone(),
            stderr: case.stderr.clone(),
            compile_output: case.compile_output.clone(),
            time: case.time,
            memory: case.memory,
            created_at: now,
        }));
        Ok(())
    }

    async fn list_testcase_results(&self, submission_id: Uuid) -> AppResult<Vec<TestcaseResult>> {
        let tables = self.tables()?;
        let mut results: Vec<TestcaseResult> = tables
            .testcase_results
            .iter()
            .filter(|r| r.submission_id == submission_id)
            .cloned()
            .collect();
        results.sort_by_key(|r| r.case_index);
        Ok(results)
    }

    async fn complete_submission(&self, id: Uuid, verdict: &Verdict) -> AppResult<Submission> {
        if verdict.passed_tests < 0 || verdict.passed_tests > verdict.total_tests {
            return Err(AppError::Validation("passed tests out of range".to_string()));
        }

        let mut tables = self.tables()?;
        let submission = tables.pending_submission(&id)?;

        submission.status = verdict.status.as_str().to_string();
        submission.passed_tests = verdict.passed_tests;
        submission.total_tests = verdict.total_tests;
        submission.avg_time = Some(verdict.avg_time);
        submission.avg_memory = Some(verdict.avg_memory);
        submission.judged_at = Some(Utc::now());
        Ok(submission.clone())
    }

    async fn find_contest(&self, id: Uuid) -> AppResult<Option<Contest>> {
        Ok(self.tables()?.contests.get(&id).cloned())
    }

    async fn find_contest_problem(&self, contest_id: Uuid, problem_id: Uuid) -> AppResult<Option<ContestProblem>> {
        Ok(self
            .tables()?
            .contest_problems
            .iter()
            .find(|cp| cp.contest_id == contest_id && cp.problem_id == problem_id)
            .cloned())
    }

    async fn register_participant(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<ContestParticipant> {
        let mut tables = self.tables()?;
        tables.require_contest(&contest_id)?;
        tables.require_user(&user_id)?;
        if tables
            .participants
            .iter()
            .any(|p| p.contest_id == contest_id && p.user_id == user_id)
        {
            return Err(AppError::AlreadyExists("Already registered for this contest".to_string()));
        }

        // Registration times stay strictly increasing at the database's
        // microsecond precision so load order matches registration order.
        let now = Utc::now();
        let registered_at = tables
            .participants
            .iter()
            .map(|p| p.registered_at + Duration::microseconds(1))
            .max()
            .map_or(now, |next| next.max(now));

        let participant = ContestParticipant {
            id: Uuid::new_v4(),
            contest_id,
            user_id,
            score: 0,
            penalty: 0,
            finish_time: None,
            rank: None,
            registered_at,
        };
        tables.participants.push(participant.clone());
        Ok(participant)
    }

    async fn find_participant(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Option<ContestParticipant>> {
        Ok(self
            .tables()?
            .participants
            .iter()
            .find(|p| p.contest_id == contest_id && p.user_id == user_id)
            .cloned())
    }

    async fn list_participants(&self, contest_id: Uuid) -> AppResult<Vec<ContestParticipant>> {
        Ok(self.tables()?.participants_of(&contest_id))
    }

    async fn create_contest_submission(&self, new: NewContestSubmission) -> AppResult<ContestSubmission> {
        let mut tables = self.tables()?;
        tables.require_contest(&new.contest_id)?;
        tables.require_user(&new.user_id)?;
        tables.require_problem(&new.problem_id)?;
        if !tables.submissions.contains_key(&new.submission_id) {
            return Err(AppError::NotFound(format!("Submission {} not found", new.submission_id)));
        }
        if tables
            .contest_submissions
            .iter()
            .any(|cs| cs.submission_id == new.submission_id)
        {
            return Err(AppError::AlreadyExists("Submission already recorded for contest".to_string()));
        }

        let submission = ContestSubmission {
            id: Uuid::new_v4(),
            contest_id: new.contest_id,
            user_id: new.user_id,
            problem_id: new.problem_id,
            submission_id: new.submission_id,
            accepted: new.accepted,
            points: new.points,
            penalty: new.penalty,
            submitted_at: new.submitted_at,
        };
        tables.contest_submissions.push(submission.clone());
        Ok(submission)
    }

    async fn list_contest_submissions(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Vec<ContestSubmission>> {
        let tables = self.tables()?;
        let mut submissions: Vec<ContestSubmission> = tables
            .contest_submissions
            .iter()
            .filter(|cs| cs.contest_id == contest_id && cs.user_id == user_id)
            .cloned()
            .collect();
        submissions.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        Ok(submissions)
    }

    async fn update_participant_score(
        &self,
        contest_id: Uuid,
        user_id: Uuid,
        score: ParticipantScore,
    ) -> AppResult<()> {
        let mut tables = self.tables()?;
        let participant = tables
            .participants
            .iter_mut()
            .find(|p| p.contest_id == contest_id && p.user_id == user_id)
            .ok_or_else(|| AppError::NotFound("Contest participant not found".to_string()))?;

        participant.score = score.score;
        participant.penalty = score.penalty;
        participant.finish_time = score.finish_time;
        Ok(())
    }

    async fn refresh_ranks(&self, contest_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
        let mut tables = self.tables()?;
        let leaderboard = scoring::rank_participants(tables.participants_of(&contest_id));

        let ranks: HashMap<Uuid, i32> = leaderboard.iter().map(|e| (e.user_id, e.rank)).collect();
        for participant in tables.participants.iter_mut().filter(|p| p.contest_id == contest_id) {
            participant.rank = ranks.get(&participant.user_id).copied();
        }

        Ok(leaderboard)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    async fn get_user_stats(&self, user_id: Uuid) -> AppResult<UserStats> {
        Ok(self
            .tables()?
            .user_stats
            .get(&user_id)
            .cloned()
            .unwrap_or(UserStats {
                user_id,
                ..Default::default()
            }))
    }

    async fn list_rating_inputs(&self, contest_id: Uuid, default_rating: i32) -> AppResult<Vec<RatingParticipant>> {
        let tables = self.tables()?;
        let mut inputs: Vec<RatingParticipant> = tables
            .participants_of(&contest_id)
            .into_iter()
            .filter_map(|p| {
                let rank = p.rank?;
                let user = tables.users.get(&p.user_id)?;
                Some(RatingParticipant {
                    user_id: p.user_id,
                    rank,
                    rating: user.rating_or(default_rating),
                })
            })
            .collect();
        inputs.sort_by_key(|p| p.rank);
        Ok(inputs)
    }

    async fn commit_finalization(&self, contest_id: Uuid, changes: &[RatingChange]) -> AppResult<()> {
        let mut tables = self.tables()?;

        let contest = tables
            .contests
            .get(&contest_id)
            .ok_or_else(|| AppError::NotFound(format!("Contest {} not found", contest_id)))?;
        if contest.rating_finalized {
            return Err(AppError::AlreadyFinalized(contest_id));
        }

        let mut users = HashSet::new();
        for change in changes {
            tables.require_user(&change.user_id)?;
            if !users.insert(change.user_id)
                || tables
                    .rating_history
                    .iter()
                    .any(|h| h.contest_id == contest_id && h.user_id == change.user_id)
            {
                return Err(AppError::AlreadyExists("Rating history already recorded".to_string()));
            }
        }

        let now = Utc::now();
        for change in changes {
            tables.rating_history.push(RatingHistory {
                id: Uuid::new_v4(),
                contest_id,
                user_id: change.user_id,
                old_rating: change.old_rating,
                new_rating: change.new_rating,
                delta: change.delta,
                rank: change.rank,
                created_at: now,
            });

            if let Some(user) = tables.users.get_mut(&change.user_id) {
                user.rating = Some(change.new_rating);
                let peak = user.max_rating.unwrap_or(change.old_rating).max(change.old_rating);
                user.max_rating = Some(peak.max(change.new_rating));
                user.contests_participated += 1;
            }
        }

        if let Some(contest) = tables.contests.get_mut(&contest_id) {
            contest.rating_finalized = true;
            contest.finalized_at = Some(now);
        }
        Ok(())
    }

    async fn revert_finalization(&self, contest_id: Uuid) -> AppResult<usize> {
        let mut tables = self.tables()?;
        tables.require_contest(&contest_id)?;

        let (reverted, kept): (Vec<RatingHistory>, Vec<RatingHistory>) = std::mem::take(&mut tables.rating_history)
            .into_iter()
            .partition(|h| h.contest_id == contest_id);
        tables.rating_history = kept;

        for entry in &reverted {
            if let Some(user) = tables.users.get_mut(&entry.user_id) {
                user.rating = Some(entry.old_rating);
                user.contests_participated = (user.contests_participated - 1).max(0);
            }
        }

        if let Some(contest) = tables.contests.get_mut(&contest_id) {
            contest.rating_finalized = false;
            contest.finalized_at = None;
        }
        Ok(reverted.len())
    }

    async fn list_rating_history(&self, contest_id: Uuid) -> AppResult<Vec<RatingHistory>> {
        let tables = self.tables()?;
        let mut history: Vec<RatingHistory> = tables
            .rating_history
            .iter()
            .filter(|h| h.contest_id == contest_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| a.rank.cmp(&b.rank).then(a.user_id.cmp(&b.user_id)));
        Ok(history)
    }
}
