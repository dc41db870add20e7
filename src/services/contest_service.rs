//! Contest scoring service
//!
//! Records graded contest attempts, recomputes participant standings and
//! keeps the persisted ranks of every participant in sync. Standings work on
//! one contest never interleaves inside this process, finalization included;
//! the PostgreSQL store adds an advisory lock for other processes. Once a
//! contest's ratings are finalized no further attempts are scored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::{
    config::ContestConfig,
    db::Store,
    error::{AppError, AppResult},
    events::{EventSink, PipelineEvent},
    models::{Contest, ContestProblem, ContestSubmission, LeaderboardEntry, NewContestSubmission, Submission},
    scoring,
};

/// Contest service for scoring and ranking
pub struct ContestService {
    store: Arc<dyn Store>,
    events: Arc<dyn EventSink>,
    config: ContestConfig,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContestService {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventSink>, config: ContestConfig) -> Self {
        Self {
            store,
            events,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Per-contest serialization point for standings.
    ///
    /// Entries nobody holds or waits on are dropped, so the map only tracks
    /// contests with work in flight.
    fn contest_lock(&self, contest_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(contest_id).or_default().clone()
    }

    /// Hold a contest's standings lock until the guard is dropped
    pub async fn lock_standings(&self, contest_id: Uuid) -> OwnedMutexGuard<()> {
        self.contest_lock(contest_id).lock_owned().await
    }

    /// Points and penalty earned by one graded attempt
    pub fn attempt_value(&self, contest: &Contest, problem: &ContestProblem, submission: &Submission) -> (i32, i64) {
        if submission.status().is_accepted() {
            let points = problem.points.unwrap_or(self.config.default_problem_points);
            (points, contest.minutes_since_start(submission.submitted_at))
        } else {
            (0, self.config.wrong_penalty_minutes)
        }
    }

    /// Record a judged contest submission and rescore its author.
    ///
    /// Fails with `AlreadyFinalized` without recording anything once the
    /// contest's ratings are committed.
    pub async fn handle_submission(&self, submission: &Submission) -> AppResult<Vec<LeaderboardEntry>> {
        let contest_id = submission
            .contest_id
            .ok_or_else(|| AppError::Validation("Submission is not part of a contest".to_string()))?;

        let _guard = self.lock_standings(contest_id).await;

        let contest = self
            .store
            .find_contest(contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Contest not found".to_string()))?;
        if contest.rating_finalized {
            return Err(AppError::AlreadyFinalized(contest_id));
        }
        let problem = self
            .store
            .find_contest_problem(contest_id, submission.problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Problem is not part of this contest".to_string()))?;

        let recorded = self.record_attempt(&contest, &problem, submission).await?;
        tracing::debug!(
            contest_id = %contest_id,
            submission_id = %submission.id,
            accepted = recorded.accepted,
            points = recorded.points,
            penalty = recorded.penalty,
            "Recorded contest attempt"
        );

        self.rescore_locked(contest_id, submission.user_id).await
    }

    async fn record_attempt(
        &self,
        contest: &Contest,
        problem: &ContestProblem,
        submission: &Submission,
    ) -> AppResult<ContestSubmission> {
        let (points, penalty) = self.attempt_value(contest, problem, submission);

        self.store
            .create_contest_submission(NewContestSubmission {
                contest_id: contest.id,
                user_id: submission.user_id,
                problem_id: submission.problem_id,
                submission_id: submission.id,
                accepted: submission.status().is_accepted(),
                points,
                penalty,
                submitted_at: submission.submitted_at,
            })
            .await
    }

    /// Recompute one participant's standing from their full history, then
    /// re-rank the whole contest
    pub async fn rescore(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
        let _guard = self.lock_standings(contest_id).await;
        self.rescore_locked(contest_id, user_id).await
    }

    async fn rescore_locked(&self, contest_id: Uuid, user_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
        let history = self.store.list_contest_submissions(contest_id, user_id).await?;
        let standing = scoring::score_participant(&history);
        self.store.update_participant_score(contest_id, user_id, standing).await?;

        tracing::debug!(
            contest_id = %contest_id,
            user_id = %user_id,
            score = standing.score,
            penalty = standing.penalty,
            "Participant rescored"
        );

        self.refresh_locked(contest_id).await
    }

    /// Re-rank every participant of a contest
    pub async fn refresh_ranks(&self, contest_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
        if self.store.find_contest(contest_id).await?.is_none() {
            return Err(AppError::NotFound("Contest not found".to_string()));
        }

        let _guard = self.lock_standings(contest_id).await;
        self.refresh_locked(contest_id).await
    }

    /// Re-rank a contest whose standings lock the caller already holds
    pub(crate) async fn refresh_locked(&self, contest_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
        let leaderboard = self.store.refresh_ranks(contest_id).await?;

        self.events
            .emit(PipelineEvent::LeaderboardUpdate {
                contest_id,
                leaderboard: leaderboard.clone(),
            })
            .await;

        Ok(leaderboard)
    }

    /// Current persisted standings, best rank first
    pub async fn leaderboard(&self, contest_id: Uuid) -> AppResult<Vec<LeaderboardEntry>> {
        let mut participants = self.store.list_participants(contest_id).await?;
        participants.sort_by_key(|p| (p.rank.is_none(), p.rank));

        Ok(participants
            .into_iter()
            .enumerate()
            .map(|(i, p)| LeaderboardEntry {
                user_id: p.user_id,
                rank: p.rank.unwrap_or(i as i32 + 1),
                score: p.score,
                penalty: p.penalty,
                finish_time: p.finish_time,
            })
            .collect())
    }
}
