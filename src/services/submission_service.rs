//! Submission service
//!
//! Drives one submission from PENDING to a terminal status: validate, record
//! the pending row, run every test case through the judge, persist per-case
//! results and the reduced verdict, then apply side effects and hand contest
//! submissions to the contest service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::languages,
    db::Store,
    error::{AppError, AppResult},
    events::{EventSink, PipelineEvent},
    judge::{JudgeClient, JudgeError, JudgeTestCase},
    models::{ContestStatus, NewSubmission, Problem, Submission, TestCase},
    services::ContestService,
    utils::{validate_language, validate_source_code},
    verdict::{self, Verdict},
};

/// A submission as received from the queue
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitRequest {
    pub user_id: Uuid,
    pub problem_id: Uuid,
    pub contest_id: Option<Uuid>,
    #[validate(custom(function = "validate_language"))]
    pub language: String,
    #[validate(custom(function = "validate_source_code"))]
    pub source_code: String,
}

/// Submission service for the grading pipeline
pub struct SubmissionService {
    store: Arc<dyn Store>,
    judge: Arc<dyn JudgeClient>,
    events: Arc<dyn EventSink>,
    contests: Arc<ContestService>,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn Store>,
        judge: Arc<dyn JudgeClient>,
        events: Arc<dyn EventSink>,
        contests: Arc<ContestService>,
    ) -> Self {
        Self {
            store,
            judge,
            events,
            contests,
        }
    }

    /// Grade a submission end to end.
    ///
    /// Returns the terminal submission. Once the pending row exists, judge
    /// and store failures leave it INTERNAL_ERROR with the message in
    /// `stderr` instead of surfacing as errors. Errors are returned for
    /// rejected input, for a store that cannot even mark the failure, and
    /// for a failed contest hand-off.
    pub async fn submit(&self, request: SubmitRequest) -> AppResult<Submission> {
        let (problem, test_cases, language_id) = self.validate(&request).await?;

        let submission = self
            .store
            .create_submission(NewSubmission {
                user_id: request.user_id,
                problem_id: request.problem_id,
                contest_id: request.contest_id,
                language: request.language.to_ascii_lowercase(),
                language_id,
                source_code: request.source_code,
                total_tests: test_cases.len() as i32,
            })
            .await?;

        tracing::info!(
            submission_id = %submission.id,
            user_id = %submission.user_id,
            problem_id = %submission.problem_id,
            tests = submission.total_tests,
            "Submission created"
        );

        let judge_cases: Vec<JudgeTestCase> = test_cases
            .iter()
            .map(|tc| JudgeTestCase {
                stdin: tc.input.clone(),
                expected_output: tc.expected_output.clone(),
            })
            .collect();

        let results = match self
            .judge
            .execute(&submission.source_code, language_id, &judge_cases)
            .await
        {
            Ok(results) => results,
            Err(e) => return self.fail(submission, e.into()).await,
        };

        let expected: Vec<&str> = test_cases.iter().map(|tc| tc.expected_output.as_str()).collect();
        let verdict = match verdict::reduce(results, &expected) {
            Ok(verdict) => verdict,
            Err(e) => {
                return self
                    .fail(submission, JudgeError::Protocol(e.to_string()).into())
                    .await;
            }
        };

        let judged = match self.persist_verdict(submission.id, &verdict).await {
            Ok(judged) => judged,
            Err(e) => return self.fail(submission, e).await,
        };

        tracing::info!(
            submission_id = %judged.id,
            status = %verdict.status,
            passed = verdict.passed_tests,
            total = verdict.total_tests,
            "Submission judged"
        );

        self.apply_side_effects(&judged, &problem, &verdict).await;

        if let Some(contest_id) = judged.contest_id {
            match self.contests.handle_submission(&judged).await {
                Ok(_) => {}
                Err(AppError::AlreadyFinalized(_)) => tracing::warn!(
                    submission_id = %judged.id,
                    contest_id = %contest_id,
                    "Contest ratings already finalized, attempt not scored"
                ),
                Err(e) => {
                    tracing::error!(
                        submission_id = %judged.id,
                        contest_id = %contest_id,
                        error = %e,
                        "Contest scoring failed, attempt needs replay"
                    );
                    return Err(e);
                }
            }
        }

        Ok(judged)
    }

    /// Store the per-case results, then the verdict
    async fn persist_verdict(&self, submission_id: Uuid, verdict: &Verdict) -> AppResult<Submission> {
        self.store.save_testcase_results(submission_id, &verdict.cases).await?;
        self.store.complete_submission(submission_id, verdict).await
    }

    /// Reject bad input before any row is written
    async fn validate(&self, request: &SubmitRequest) -> AppResult<(Problem, Vec<TestCase>, i32)> {
        request.validate()?;

        let language_id = languages::judge_id(&request.language)
            .ok_or_else(|| AppError::Validation(format!("Unsupported language: {}", request.language)))?;

        let problem = self
            .store
            .find_problem(request.problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Problem not found".to_string()))?;

        let test_cases = self.store.get_test_cases(problem.id).await?;
        if test_cases.is_empty() {
            return Err(AppError::Validation("Problem has no test cases".to_string()));
        }

        if let Some(contest_id) = request.contest_id {
            let contest = self
                .store
                .find_contest(contest_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Contest not found".to_string()))?;

            if contest.status() != ContestStatus::Ongoing {
                return Err(AppError::Validation("Contest is not active".to_string()));
            }

            if self
                .store
                .find_contest_problem(contest_id, problem.id)
                .await?
                .is_none()
            {
                return Err(AppError::Validation("Problem is not part of this contest".to_string()));
            }

            if self
                .store
                .find_participant(contest_id, request.user_id)
                .await?
                .is_none()
            {
                return Err(AppError::Forbidden("Not registered for this contest".to_string()));
            }
        }

        Ok((problem, test_cases, language_id))
    }

    /// Terminate a pending submission that could not be graded.
    ///
    /// If even that write fails the original error is returned.
    async fn fail(&self, submission: Submission, error: AppError) -> AppResult<Submission> {
        match &error {
            AppError::Judge(JudgeError::Protocol(_)) => tracing::error!(
                submission_id = %submission.id,
                error = %error,
                "Judge integration defect"
            ),
            AppError::Judge(_) => tracing::warn!(
                submission_id = %submission.id,
                error = %error,
                "Judge failed, submission not graded"
            ),
            _ => tracing::error!(
                submission_id = %submission.id,
                error = %error,
                "Failed to store verdict"
            ),
        }

        let failed = match self.store.fail_submission(submission.id, &error.to_string()).await {
            Ok(failed) => failed,
            Err(e) => {
                tracing::error!(
                    submission_id = %submission.id,
                    error = %e,
                    "Failed to mark submission as internal error"
                );
                return Err(error);
            }
        };

        self.events
            .emit(PipelineEvent::SubmissionUpdate {
                submission_id: failed.id,
                status: failed.status(),
                passed_tests: failed.passed_tests,
                total_tests: failed.total_tests,
                time: None,
                memory: None,
            })
            .await;

        Ok(failed)
    }

    /// Best-effort bookkeeping after the verdict is stored
    async fn apply_side_effects(&self, submission: &Submission, problem: &Problem, verdict: &Verdict) {
        let accepted = verdict.status.is_accepted();

        if accepted {
            match self
                .store
                .mark_solved(submission.user_id, problem.id, problem.difficulty())
                .await
            {
                Ok(true) => tracing::debug!(
                    user_id = %submission.user_id,
                    problem_id = %problem.id,
                    "First solve recorded"
                ),
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    submission_id = %submission.id,
                    error = %e,
                    "Failed to record solve"
                ),
            }
        }

        if let Err(e) = self.store.record_problem_attempt(problem.id, accepted).await {
            tracing::warn!(
                submission_id = %submission.id,
                error = %e,
                "Failed to update problem statistics"
            );
        }

        self.events
            .emit(PipelineEvent::SubmissionUpdate {
                submission_id: submission.id,
                status: verdict.status,
                passed_tests: verdict.passed_tests,
                total_tests: verdict.total_tests,
                time: Some(verdict.avg_time),
                memory: Some(verdict.avg_memory),
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        config::ContestConfig,
        db::MemoryStore,
        events::{LogEventSink, MockEventSink},
        judge::{JudgeResult, JudgeStatus, MockJudgeClient},
        models::{
            Contest, ContestParticipant, ContestProblem, ContestSubmission, Difficulty, LeaderboardEntry,
            NewContestSubmission, ParticipantScore, RatingChange, RatingHistory, RatingParticipant,
            SubmissionStatus, TestcaseResult, User, UserStats,
        },
        verdict::CaseOutcome,
    };

    /// Memory store whose per-case result writes always fail
    struct BrokenResultsStore {
        inner: Arc<MemoryStore>,
    }

    #[async_trait]
    impl Store for BrokenResultsStore {
        async fn find_problem(&self, id: Uuid) -> AppResult<Option<Problem>> {
            self.inner.find_problem(id).await
        }

        async fn get_test_cases(&self, problem_id: Uuid) -> AppResult<Vec<TestCase>> {
            self.inner.get_test_cases(problem_id).await
        }

        async fn record_problem_attempt(&self, problem_id: Uuid, accepted: bool) -> AppResult<Problem> {
            self.inner.record_problem_attempt(problem_id, accepted).await
        }

        async fn mark_solved(&self, user_id: Uuid, problem_id: Uuid, difficulty: Difficulty) -> AppResult<bool> {
            self.inner.mark_solved(user_id, problem_id, difficulty).await
        }

        async fn create_submission(&self, submission: NewSubmission) -> AppResult<Submission> {
            self.inner.create_submission(submission).await
        }

        async fn find_submission(&self, id: Uuid) -> AppResult<Option<Submission>> {
            self.inner.find_submission(id).await
        }

        async fn fail_submission(&self, id: Uuid, message: &str) -> AppResult<Submission> {
            self.inner.fail_submission(id, message).await
        }

        async fn save_testcase_results(&self, _submission_id: Uuid, _cases: &[CaseOutcome]) -> AppResult<()> {
            Err(AppError::Database("connection reset by peer".to_string()))
        }

        async fn list_testcase_results(&self, submission_id: Uuid) -> AppResult<Vec<TestcaseResult>> {
            self.inner.list_testcase_results(submission_id).await
        }

        async fn complete_submission(&self, id: Uuid, verdict: &Verdict) -> AppResult<Submission> {
            self.inner.complete_submission(id, verdict).await
        }

        async fn find_contest(&self, id: Uuid) -> AppResult<Option<Contest>> {
            self.inner.find_contest(id).await
        }

        async fn find_contest_problem(&self, contest_id: Uuid, problem_id: Uuid) -> AppResult<Option<ContestProblem>> {
            self.inner.find_contest_problem(contest_id, problem_id).await
        }

        async fn register_participant(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<ContestParticipant> {
            self.inner.register_participant(contest_id, user_id).await
        }

        async fn find_participant(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Option<ContestParticipant>> {
            self.inner.find_participant(contest_id, user_id).await
        }

        async fn list_participants(&self, contest_id: Uuid) -> AppResult<Vec<ContestParticipant>> {
            self.inner.list_participants(contest_id).await
        }

        async fn create_contest_submission(&self, submission: NewContestSubmission) -> AppResult<ContestSubmission> {
            self.inner.create_contest_submission(submission).await
        }

        async fn list_contest_submissions(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Vec<ContestSubmission>> {
            self.inner.list_contest_submissions(contest_id, user_id).await
        }

        async fn update_participant_score(
            &self,
            contest_id: Uuid,
            user_id: Uuid,
            score: ParticipantScore,
        ) -> AppResult<()> {
            self.inner.update_participant_score(contest_id, user_id, score).await
        }

        async fn refresh_ranks(&self, contest_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
            self.inner.refresh_ranks(contest_id).await
        }

        async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
            self.inner.find_user(id).await
        }

        async fn get_user_stats(&self, user_id: Uuid) -> AppResult<UserStats> {
            self.inner.get_user_stats(user_id).await
        }

        async fn list_rating_inputs(&self, contest_id: Uuid, default_rating: i32) -> AppResult<Vec<RatingParticipant>> {
            self.inner.list_rating_inputs(contest_id, default_rating).await
        }

        async fn commit_finalization(&self, contest_id: Uuid, changes: &[RatingChange]) -> AppResult<()> {
            self.inner.commit_finalization(contest_id, changes).await
        }

        async fn revert_finalization(&self, contest_id: Uuid) -> AppResult<usize> {
            self.inner.revert_finalization(contest_id).await
        }

        async fn list_rating_history(&self, contest_id: Uuid) -> AppResult<Vec<RatingHistory>> {
            self.inner.list_rating_history(contest_id).await
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        user_id: Uuid,
        problem_id: Uuid,
    }

    fn fixture(cases: &[(&str, &str)]) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let user = store.insert_user("grace", None).unwrap();
        let problem = store.insert_problem("Sum", Difficulty::Easy).unwrap();
        for (input, expected) in cases {
            store.insert_test_case(problem.id, input, expected).unwrap();
        }
        Fixture {
            store,
            user_id: user.id,
            problem_id: problem.id,
        }
    }

    fn service(store: Arc<dyn Store>, judge: MockJudgeClient, events: Arc<dyn EventSink>) -> SubmissionService {
        let contests = Arc::new(ContestService::new(store.clone(), events.clone(), ContestConfig::default()));
        SubmissionService::new(store, Arc::new(judge), events, contests)
    }

    fn request(f: &Fixture) -> SubmitRequest {
        SubmitRequest {
            user_id: f.user_id,
            problem_id: f.problem_id,
            contest_id: None,
            language: "python".to_string(),
            source_code: "a, b = map(int, input().split())\nprint(a + b)".to_string(),
        }
    }

    fn run(status: JudgeStatus, stdout: &str, time: f64, memory: i64) -> JudgeResult {
        JudgeResult {
            token: Uuid::new_v4().to_string(),
            status,
            stdout: Some(stdout.to_string()),
            stderr: None,
            compile_output: None,
            time: Some(time),
            memory: Some(memory),
        }
    }

    #[tokio::test]
    async fn test_matching_outputs_are_accepted() {
        let f = fixture(&[("1 2", "3"), ("2 5", "7")]);

        let mut judge = MockJudgeClient::new();
        judge
            .expect_execute()
            .withf(|_, language_id, cases| *language_id == 71 && cases.len() == 2 && cases[1].stdin == "2 5")
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    run(JudgeStatus::Accepted, "3\n", 0.01, 900),
                    run(JudgeStatus::Accepted, "7\n", 0.03, 1100),
                ])
            });

        let mut events = MockEventSink::new();
        events
            .expect_emit()
            .withf(|e| {
                matches!(
                    e,
                    PipelineEvent::SubmissionUpdate {
                        status: SubmissionStatus::Accepted,
                        passed_tests: 2,
                        total_tests: 2,
                        ..
                    }
                )
            })
            .times(1)
            .returning(|_| ());

        let pipeline = service(f.store.clone(), judge, Arc::new(events));
        let submission = pipeline.submit(request(&f)).await.unwrap();

        assert_eq!(submission.status(), SubmissionStatus::Accepted);
        assert_eq!(submission.passed_tests, 2);
        assert_eq!(submission.total_tests, 2);
        assert!((submission.avg_time.unwrap() - 0.02).abs() < 1e-9);
        assert!((submission.avg_memory.unwrap() - 1000.0).abs() < 1e-9);

        let results = f.store.list_testcase_results(submission.id).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed));

        let problem = f.store.find_problem(f.problem_id).await.unwrap().unwrap();
        assert_eq!(problem.total_submissions, 1);
        assert_eq!(problem.total_accepted, 1);
        assert_eq!(problem.acceptance_rate, 1.0);

        let stats = f.store.get_user_stats(f.user_id).await.unwrap();
        assert_eq!(stats.easy_solved, 1);
        assert_eq!(stats.total_solved, 1);
    }

    #[tokio::test]
    async fn test_trailing_whitespace_is_ignored() {
        let f = fixture(&[("", "hello world")]);

        let mut judge = MockJudgeClient::new();
        judge
            .expect_execute()
            .returning(|_, _, _| Ok(vec![run(JudgeStatus::Accepted, "hello world  \n\n", 0.0, 0)]));

        let pipeline = service(f.store.clone(), judge, Arc::new(LogEventSink));
        let submission = pipeline.submit(request(&f)).await.unwrap();
        assert_eq!(submission.status(), SubmissionStatus::Accepted);
    }

    #[tokio::test]
    async fn test_second_accept_is_not_a_new_solve() {
        let f = fixture(&[("x", "x")]);

        let mut judge = MockJudgeClient::new();
        judge
            .expect_execute()
            .times(2)
            .returning(|_, _, _| Ok(vec![run(JudgeStatus::Accepted, "x", 0.0, 0)]));

        let pipeline = service(f.store.clone(), judge, Arc::new(LogEventSink));
        pipeline.submit(request(&f)).await.unwrap();
        pipeline.submit(request(&f)).await.unwrap();

        let stats = f.store.get_user_stats(f.user_id).await.unwrap();
        assert_eq!(stats.total_solved, 1);
        let problem = f.store.find_problem(f.problem_id).await.unwrap().unwrap();
        assert_eq!(problem.total_submissions, 2);
    }

    #[tokio::test]
    async fn test_wrong_answer_persists_every_case() {
        let f = fixture(&[("a", "1"), ("b", "2"), ("c", "3")]);

        let mut judge = MockJudgeClient::new();
        judge.expect_execute().returning(|_, _, _| {
            Ok(vec![
                run(JudgeStatus::Accepted, "1", 0.1, 10),
                run(JudgeStatus::WrongAnswer, "20", 0.1, 10),
                run(JudgeStatus::TimeLimitExceeded, "", 2.0, 10),
            ])
        });

        let pipeline = service(f.store.clone(), judge, Arc::new(LogEventSink));
        let submission = pipeline.submit(request(&f)).await.unwrap();

        assert_eq!(submission.status(), SubmissionStatus::WrongAnswer);
        assert_eq!(submission.passed_tests, 1);

        let results = f.store.list_testcase_results(submission.id).await.unwrap();
        let statuses: Vec<&str> = results.iter().map(|r| r.status.as_str()).collect();
        assert_eq!(statuses, vec!["ACCEPTED", "WRONG_ANSWER", "TIME_LIMIT_EXCEEDED"]);

        let problem = f.store.find_problem(f.problem_id).await.unwrap().unwrap();
        assert_eq!(problem.total_accepted, 0);
        assert_eq!(problem.acceptance_rate, 0.0);
        assert_eq!(f.store.get_user_stats(f.user_id).await.unwrap().total_solved, 0);
    }

    #[tokio::test]
    async fn test_judge_timeout_is_internal_error_without_results() {
        let f = fixture(&[("1", "1")]);

        let mut judge = MockJudgeClient::new();
        judge
            .expect_execute()
            .returning(|_, _, _| Err(JudgeError::Timeout { polls: 30 }));

        let mut events = MockEventSink::new();
        events
            .expect_emit()
            .withf(|e| {
                matches!(
                    e,
                    PipelineEvent::SubmissionUpdate {
                        status: SubmissionStatus::InternalError,
                        ..
                    }
                )
            })
            .times(1)
            .returning(|_| ());

        let pipeline = service(f.store.clone(), judge, Arc::new(events));
        let submission = pipeline.submit(request(&f)).await.unwrap();

        assert_eq!(submission.status(), SubmissionStatus::InternalError);
        assert_eq!(
            submission.stderr.as_deref(),
            Some("Judge error: judge did not finish the batch after 30 polls")
        );
        assert!(f.store.list_testcase_results(submission.id).await.unwrap().is_empty());

        let problem = f.store.find_problem(f.problem_id).await.unwrap().unwrap();
        assert_eq!(problem.total_submissions, 0);
    }

    #[tokio::test]
    async fn test_short_judge_reply_is_internal_error() {
        let f = fixture(&[("1", "1"), ("2", "2")]);

        let mut judge = MockJudgeClient::new();
        judge
            .expect_execute()
            .returning(|_, _, _| Ok(vec![run(JudgeStatus::Accepted, "1", 0.0, 0)]));

        let pipeline = service(f.store.clone(), judge, Arc::new(LogEventSink));
        let submission = pipeline.submit(request(&f)).await.unwrap();

        assert_eq!(submission.status(), SubmissionStatus::InternalError);
        assert!(f.store.list_testcase_results(submission.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_requests_create_nothing() {
        let f = fixture(&[("1", "1")]);

        let mut judge = MockJudgeClient::new();
        judge.expect_execute().never();
        let pipeline = service(f.store.clone(), judge, Arc::new(LogEventSink));

        let mut bad_language = request(&f);
        bad_language.language = "cobol".to_string();
        assert!(matches!(pipeline.submit(bad_language).await, Err(AppError::Validation(_))));

        let mut empty_source = request(&f);
        empty_source.source_code = "   ".to_string();
        assert!(matches!(pipeline.submit(empty_source).await, Err(AppError::Validation(_))));

        let mut unknown_problem = request(&f);
        unknown_problem.problem_id = Uuid::new_v4();
        assert!(matches!(pipeline.submit(unknown_problem).await, Err(AppError::NotFound(_))));

        let empty = f.store.insert_problem("Empty", Difficulty::Hard).unwrap();
        let mut no_cases = request(&f);
        no_cases.problem_id = empty.id;
        assert!(matches!(pipeline.submit(no_cases).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_contest_submission_requires_registration_and_updates_standings() {
        let f = fixture(&[("1", "1")]);
        let now = Utc::now();
        let contest = f
            .store
            .insert_contest("Sprint", now - Duration::minutes(30), now + Duration::minutes(30))
            .unwrap();
        f.store.add_contest_problem(contest.id, f.problem_id, Some(300)).unwrap();

        let mut judge = MockJudgeClient::new();
        judge
            .expect_execute()
            .times(1)
            .returning(|_, _, _| Ok(vec![run(JudgeStatus::Accepted, "1", 0.0, 0)]));
        let pipeline = service(f.store.clone(), judge, Arc::new(LogEventSink));

        let mut contest_request = request(&f);
        contest_request.contest_id = Some(contest.id);

        let err = pipeline.submit(contest_request.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        f.store.register_participant(contest.id, f.user_id).await.unwrap();
        let submission = pipeline.submit(contest_request).await.unwrap();
        assert_eq!(submission.contest_id, Some(contest.id));

        let participant = f.store.find_participant(contest.id, f.user_id).await.unwrap().unwrap();
        assert_eq!(participant.score, 300);
        assert_eq!(participant.penalty, 30);
        assert_eq!(participant.rank, Some(1));
        assert_eq!(participant.finish_time, Some(submission.submitted_at));
    }

    #[tokio::test]
    async fn test_store_failure_after_judging_is_internal_error() {
        let f = fixture(&[("1 2", "3")]);

        let mut judge = MockJudgeClient::new();
        judge
            .expect_execute()
            .times(1)
            .returning(|_, _, _| Ok(vec![run(JudgeStatus::Accepted, "3", 0.01, 900)]));

        let mut events = MockEventSink::new();
        events
            .expect_emit()
            .withf(|e| {
                matches!(
                    e,
                    PipelineEvent::SubmissionUpdate {
                        status: SubmissionStatus::InternalError,
                        ..
                    }
                )
            })
            .times(1)
            .returning(|_| ());

        let store = Arc::new(BrokenResultsStore {
            inner: f.store.clone(),
        });
        let pipeline = service(store, judge, Arc::new(events));
        let submission = pipeline.submit(request(&f)).await.unwrap();

        assert_eq!(submission.status(), SubmissionStatus::InternalError);
        assert!(submission.judged_at.is_some());
        assert!(submission.stderr.as_deref().unwrap().contains("connection reset by peer"));

        let stored = f.store.find_submission(submission.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), SubmissionStatus::InternalError);
        assert!(f.store.list_testcase_results(submission.id).await.unwrap().is_empty());

        let problem = f.store.find_problem(f.problem_id).await.unwrap().unwrap();
        assert_eq!(problem.total_submissions, 0);
        assert_eq!(f.store.get_user_stats(f.user_id).await.unwrap().total_solved, 0);
    }

    #[tokio::test]
    async fn test_finalized_contest_attempt_is_graded_but_not_scored() {
        let f = fixture(&[("1", "1")]);
        let now = Utc::now();
        let contest = f
            .store
            .insert_contest("Closed early", now - Duration::minutes(30), now + Duration::minutes(30))
            .unwrap();
        f.store.add_contest_problem(contest.id, f.problem_id, None).unwrap();
        f.store.register_participant(contest.id, f.user_id).await.unwrap();
        f.store.commit_finalization(contest.id, &[]).await.unwrap();

        let mut judge = MockJudgeClient::new();
        judge
            .expect_execute()
            .times(1)
            .returning(|_, _, _| Ok(vec![run(JudgeStatus::Accepted, "1", 0.0, 0)]));
        let pipeline = service(f.store.clone(), judge, Arc::new(LogEventSink));

        let mut contest_request = request(&f);
        contest_request.contest_id = Some(contest.id);
        let submission = pipeline.submit(contest_request).await.unwrap();
        assert_eq!(submission.status(), SubmissionStatus::Accepted);

        let participant = f.store.find_participant(contest.id, f.user_id).await.unwrap().unwrap();
        assert_eq!(participant.score, 0);
        assert!(f
            .store
            .list_contest_submissions(contest.id, f.user_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_contest_must_be_running() {
        let f = fixture(&[("1", "1")]);
        let now = Utc::now();
        let contest = f
            .store
            .insert_contest("Later", now + Duration::hours(1), now + Duration::hours(2))
            .unwrap();
        f.store.add_contest_problem(contest.id, f.problem_id, None).unwrap();
        f.store.register_participant(contest.id, f.user_id).await.unwrap();

        let mut judge = MockJudgeClient::new();
        judge.expect_execute().never();
        let pipeline = service(f.store.clone(), judge, Arc::new(LogEventSink));

        let mut contest_request = request(&f);
        contest_request.contest_id = Some(contest.id);
        assert!(matches!(pipeline.submit(contest_request).await, Err(AppError::Validation(_))));
    }
}
